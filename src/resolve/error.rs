use thiserror::Error;

use super::{QueryId, RecordKind};

/// Retry classification of a failed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Try again later.
    Temporary,
    /// Do not retry.
    Permanent,
    /// Engine bookkeeping is inconsistent; abort.
    Internal,
}

/// Errors raised by a [`super::ResolverChannel`] implementation.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("cannot encode domain name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("no free query identifier")]
    Exhausted,
    #[error("no nameserver configured")]
    NoNameserver,
    #[error("resolver initialization failed: {source}")]
    Init {
        #[source]
        source: std::io::Error,
    },
    #[error("resolver I/O failed: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
}

impl ChannelError {
    pub(crate) fn invalid_name(name: &str, reason: impl ToString) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

/// Why a decoder refused an answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The server could not answer right now (SERVFAIL, truncation, ...).
    #[error("temporary server condition ({0})")]
    Transient(String),
    /// The server answered definitively with an error (NXDOMAIN, REFUSED, ...).
    #[error("negative answer ({0})")]
    Negative(String),
    #[error("malformed DNS packet: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("timed out waiting for DNS")]
    Timeout,
    #[error("unable to {action}: {source}")]
    Channel {
        action: &'static str,
        #[source]
        source: ChannelError,
    },
    #[error("unable to send {kind} DNS query for {name}: {source}")]
    Submit {
        kind: RecordKind,
        name: String,
        #[source]
        source: ChannelError,
    },
    #[error("temporary DNS error while resolving {kind} for {name}: {source}")]
    Transient {
        kind: RecordKind,
        name: String,
        #[source]
        source: DecodeError,
    },
    #[error("DNS {kind} resolution error for {name}: {source}")]
    Negative {
        kind: RecordKind,
        name: String,
        #[source]
        source: DecodeError,
    },
    #[error("DNS CNAME loop for {name}")]
    CnameLoop { name: String },
    #[error("answer {0} matches no pending query")]
    UnknownQuery(QueryId),
    #[error("query id {0} handed out twice while pending")]
    DuplicateQuery(QueryId),
}

impl ResolveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout | Self::Channel { .. } | Self::Submit { .. } | Self::Transient { .. } => {
                FailureKind::Temporary
            }
            Self::Negative { .. } | Self::CnameLoop { .. } => FailureKind::Permanent,
            Self::UnknownQuery(_) | Self::DuplicateQuery(_) => FailureKind::Internal,
        }
    }

    pub fn is_temporary(&self) -> bool {
        self.kind() == FailureKind::Temporary
    }

    pub fn is_permanent(&self) -> bool {
        self.kind() == FailureKind::Permanent
    }

    pub(crate) fn channel(action: &'static str, source: ChannelError) -> Self {
        Self::Channel { action, source }
    }

    pub(crate) fn submit(kind: RecordKind, name: &str, source: ChannelError) -> Self {
        Self::Submit {
            kind,
            name: name.to_string(),
            source,
        }
    }

    /// Malformed packets count as temporary, like transient server errors.
    pub(crate) fn decode(kind: RecordKind, name: &str, source: DecodeError) -> Self {
        let name = name.to_string();
        match source {
            DecodeError::Negative(_) => Self::Negative { kind, name, source },
            DecodeError::Transient(_) | DecodeError::Malformed(_) => {
                Self::Transient { kind, name, source }
            }
        }
    }
}
