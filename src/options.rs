use std::net::SocketAddr;
use std::time::{Duration, Instant};

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Configuration knobs for [`crate::resolve`].
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Budget shared by every query of one resolution.
    pub timeout_ms: u64,
    /// Skip MX discovery and deliver to the host itself (routing override).
    pub direct: bool,
    /// Issue AAAA queries alongside A queries.
    pub ipv6: bool,
    /// Recursive nameservers to query; empty means the system configuration.
    pub nameservers: Vec<SocketAddr>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            direct: false,
            ipv6: true,
            nameservers: Vec::new(),
        }
    }
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    pub fn with_ipv6(mut self, ipv6: bool) -> Self {
        self.ipv6 = ipv6;
        self
    }

    pub fn with_nameserver(mut self, addr: SocketAddr) -> Self {
        self.nameservers.push(addr);
        self
    }

    /// Return the timeout as a [`Duration`]. A zero timeout falls back to the
    /// default so that no wait is ever unbounded.
    pub fn timeout(&self) -> Duration {
        if self.timeout_ms == 0 {
            Duration::from_millis(DEFAULT_TIMEOUT_MS)
        } else {
            Duration::from_millis(self.timeout_ms)
        }
    }

    /// The single absolute deadline for a resolution starting at `now`.
    pub fn deadline(&self, now: Instant) -> Instant {
        now + self.timeout()
    }
}
