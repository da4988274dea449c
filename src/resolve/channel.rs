use std::time::Instant;

use super::{ChannelError, QueryId, RecordKind};

/// Outcome of waiting on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// At least one answer may be drained (spurious wakes are allowed).
    Ready,
    /// The deadline passed first.
    TimedOut,
}

/// An asynchronous DNS client multiplexing many queries over one handle.
///
/// Identifiers returned by [`submit`](Self::submit) must not be reused while
/// the query they name is still unanswered.
pub trait ResolverChannel {
    /// Sends a query without waiting for its answer.
    fn submit(
        &mut self,
        name: &str,
        kind: RecordKind,
        deadline: Instant,
    ) -> Result<QueryId, ChannelError>;

    /// Blocks until an answer is buffered or `deadline` passes.
    fn wait_readable(&mut self, deadline: Instant) -> Result<Readiness, ChannelError>;

    /// Returns every answer currently buffered, as raw DNS messages. May be
    /// empty.
    fn drain(&mut self) -> Result<Vec<(QueryId, Vec<u8>)>, ChannelError>;
}

impl<C: ResolverChannel + ?Sized> ResolverChannel for &mut C {
    fn submit(
        &mut self,
        name: &str,
        kind: RecordKind,
        deadline: Instant,
    ) -> Result<QueryId, ChannelError> {
        (**self).submit(name, kind, deadline)
    }

    fn wait_readable(&mut self, deadline: Instant) -> Result<Readiness, ChannelError> {
        (**self).wait_readable(deadline)
    }

    fn drain(&mut self) -> Result<Vec<(QueryId, Vec<u8>)>, ChannelError> {
        (**self).drain()
    }
}
