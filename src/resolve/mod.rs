//! Outbound delivery DNS: recipient canonicalization, MX discovery and
//! exchanger address lookup, all multiplexed over one resolver channel.
//!
//! The public entry point is [`resolve`], which uses a UDP channel to the
//! configured (or system) nameservers. [`resolve_with`] accepts any
//! [`ResolverChannel`].

mod assemble;
mod channel;
pub mod decode;
mod engine;
mod error;
mod types;
#[cfg(feature = "with-udp")]
mod udp;

use std::time::Instant;

pub use channel::{Readiness, ResolverChannel};
pub use engine::MAX_CNAME_HOPS;
pub use error::{ChannelError, DecodeError, FailureKind, ResolveError};
pub use types::{AddressRun, ExchangerSpan, MxRecord, QueryId, RecordKind, ResolvedSet, Span};
#[cfg(feature = "with-udp")]
pub use udp::UdpChannel;

use crate::local_addrs::LocalAddresses;
use crate::options::ResolveOptions;
use engine::Engine;

/// Resolves `host` and `recipients` over UDP, with the deadline derived from
/// `options.timeout_ms`.
#[cfg(feature = "with-udp")]
pub fn resolve<S: AsRef<str>>(
    host: &str,
    recipients: &[S],
    local: &LocalAddresses,
    options: &ResolveOptions,
) -> Result<ResolvedSet, ResolveError> {
    let deadline = options.deadline(Instant::now());
    let mut channel = if options.nameservers.is_empty() {
        UdpChannel::from_system_conf()
    } else {
        UdpChannel::with_servers(options.nameservers.iter().copied())
    }
    .map_err(|err| ResolveError::channel("start DNS resolver", err))?;
    resolve_with(&mut channel, host, recipients, deadline, local, options)
}

/// Runs one resolution over `channel`. Either every query is answered and the
/// packed result is returned, or the first failure unwinds everything.
pub fn resolve_with<C, S>(
    channel: C,
    host: &str,
    recipients: &[S],
    deadline: Instant,
    local: &LocalAddresses,
    options: &ResolveOptions,
) -> Result<ResolvedSet, ResolveError>
where
    C: ResolverChannel,
    S: AsRef<str>,
{
    Engine::new(channel, host, deadline, local, options.ipv6).run(recipients, options.direct)
}
