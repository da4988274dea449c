#![forbid(unsafe_code)]
//! mxresolve_lib — résolution DNS d'une livraison sortante en une seule passe
//! (CNAME des destinataires, MX, A/AAAA des échangeurs)

mod envelope;
pub mod local_addrs;
pub mod options;
pub mod resolve;

pub use local_addrs::{LocalAddresses, LocalAddrsError};
pub use options::ResolveOptions;
#[cfg(feature = "with-udp")]
pub use resolve::{UdpChannel, resolve};
pub use resolve::{
    AddressRun, ChannelError, DecodeError, ExchangerSpan, FailureKind, MAX_CNAME_HOPS, MxRecord,
    QueryId, Readiness, RecordKind, ResolveError, ResolvedSet, ResolverChannel, Span,
    resolve_with,
};
