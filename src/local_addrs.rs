//! The sending host's own addresses (`control/ipme`), never used as
//! delivery targets.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocalAddrsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: not an IPv4 or IPv6 address: {text:?}")]
    InvalidLine { line: usize, text: String },
}

/// Two sorted, deduplicated sets of raw address octets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalAddresses {
    v4: Vec<[u8; 4]>,
    v6: Vec<[u8; 16]>,
}

impl LocalAddresses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the ipme text format: one address literal per line, blank
    /// lines ignored.
    pub fn parse(text: &str) -> Result<Self, LocalAddrsError> {
        let mut addrs = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let ip = line
                .parse::<IpAddr>()
                .map_err(|_| LocalAddrsError::InvalidLine {
                    line: idx + 1,
                    text: line.to_string(),
                })?;
            addrs.push(ip);
        }
        Ok(addrs.into_iter().collect())
    }

    /// Reads and parses an ipme file. A missing file yields an empty set.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LocalAddrsError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(source) => Err(LocalAddrsError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn contains_v4(&self, octets: &[u8; 4]) -> bool {
        self.v4.binary_search(octets).is_ok()
    }

    pub fn contains_v6(&self, octets: &[u8; 16]) -> bool {
        self.v6.binary_search(octets).is_ok()
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.contains_v4(&v4.octets()),
            IpAddr::V6(v6) => self.contains_v6(&v6.octets()),
        }
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    pub fn ipv4(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.v4.iter().map(|o| Ipv4Addr::from(*o))
    }

    pub fn ipv6(&self) -> impl Iterator<Item = Ipv6Addr> + '_ {
        self.v6.iter().map(|o| Ipv6Addr::from(*o))
    }
}

impl FromIterator<IpAddr> for LocalAddresses {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        let mut v4 = Vec::new();
        let mut v6 = Vec::new();
        for ip in iter {
            match ip {
                IpAddr::V4(a) => v4.push(a.octets()),
                IpAddr::V6(a) => v6.push(a.octets()),
            }
        }
        v4.sort_unstable();
        v4.dedup();
        v6.sort_unstable();
        v6.dedup();
        Self { v4, v6 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_skips_blank_lines() {
        let set = LocalAddresses::parse("127.0.0.1\n\n::1\n192.0.2.7\n").expect("valid ipme");
        assert_eq!(set.len(), 3);
        assert!(set.contains(&"192.0.2.7".parse().unwrap()));
        assert!(set.contains(&"::1".parse().unwrap()));
        assert!(!set.contains(&"192.0.2.8".parse().unwrap()));
    }

    #[test]
    fn parse_reports_line_number() {
        let err = LocalAddresses::parse("127.0.0.1\nlocalhost\n").expect_err("bad line");
        match err {
            LocalAddrsError::InvalidLine { line, text } => {
                assert_eq!(line, 2);
                assert_eq!(text, "localhost");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let set = LocalAddresses::from_file("/nonexistent/control/ipme").expect("missing is ok");
        assert!(set.is_empty());
    }

    #[test]
    fn construction_sorts_and_dedups() {
        let set: LocalAddresses = ["10.0.0.2", "10.0.0.1", "10.0.0.2"]
            .iter()
            .map(|s| s.parse::<IpAddr>().unwrap())
            .collect();
        let v4: Vec<_> = set.ipv4().map(|a| a.to_string()).collect();
        assert_eq!(v4, ["10.0.0.1", "10.0.0.2"]);
    }

    proptest! {
        #[test]
        fn membership_matches_linear_scan(
            members in proptest::collection::vec(any::<[u8; 4]>(), 0..32),
            candidate in any::<[u8; 4]>(),
        ) {
            let set: LocalAddresses = members
                .iter()
                .map(|o| IpAddr::V4(Ipv4Addr::from(*o)))
                .collect();
            prop_assert_eq!(set.contains_v4(&candidate), members.contains(&candidate));
        }
    }
}
