use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};
use trust_dns_resolver::proto::rr::RecordType;

/// Opaque identifier handed out by a [`super::ResolverChannel`] for one
/// in-flight query.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub u16);

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Record types the engine asks for.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Cname,
    Mx,
    A,
    Aaaa,
}

impl RecordKind {
    pub fn record_type(self) -> RecordType {
        match self {
            Self::Cname => RecordType::CNAME,
            Self::Mx => RecordType::MX,
            Self::A => RecordType::A,
            Self::Aaaa => RecordType::AAAA,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::A => "A",
            Self::Aaaa => "AAAA",
        })
    }
}

/// One MX answer entry. Lower preference is tried first.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}

/// A byte range inside [`ResolvedSet::buffer`].
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Where one exchanger's addresses live in the buffer. `count` is in
/// addresses, not bytes.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressRun {
    pub offset: usize,
    pub count: usize,
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExchangerSpan {
    pub v4: AddressRun,
    pub v6: AddressRun,
}

/// Output of one resolution: canonical recipients and per-exchanger address
/// runs, all packed into one buffer.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedSet {
    pub buffer: Vec<u8>,
    pub recipients: Vec<Span>,
    pub exchangers: Vec<ExchangerSpan>,
}

impl ResolvedSet {
    /// Zero means no usable exchanger; the caller decides what that means.
    pub fn exchanger_count(&self) -> usize {
        self.exchangers.len()
    }

    pub fn recipient(&self, index: usize) -> &[u8] {
        &self.buffer[self.recipients[index].range()]
    }

    pub fn recipients(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.recipients.iter().map(|span| &self.buffer[span.range()])
    }

    pub fn ipv4(&self, exchanger: usize) -> impl Iterator<Item = Ipv4Addr> + '_ {
        let run = self.exchangers[exchanger].v4;
        self.buffer[run.offset..run.offset + run.count * 4]
            .chunks_exact(4)
            .map(|c| Ipv4Addr::new(c[0], c[1], c[2], c[3]))
    }

    pub fn ipv6(&self, exchanger: usize) -> impl Iterator<Item = Ipv6Addr> + '_ {
        let run = self.exchangers[exchanger].v6;
        self.buffer[run.offset..run.offset + run.count * 16]
            .chunks_exact(16)
            .map(|c| {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(c);
                Ipv6Addr::from(octets)
            })
    }

    pub fn total_addresses(&self) -> usize {
        self.exchangers.iter().map(|e| e.v4.count + e.v6.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_addresses() == 0
    }
}

impl fmt::Display for ResolvedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rcpt) in self.recipients().enumerate() {
            writeln!(f, "rcpt[{i}] {}", String::from_utf8_lossy(rcpt))?;
        }
        for i in 0..self.exchanger_count() {
            write!(f, "mx[{i}]")?;
            let mut any = false;
            // connection order: IPv6 first
            for ip in self.ipv6(i) {
                write!(f, " {ip}")?;
                any = true;
            }
            for ip in self.ipv4(i) {
                write!(f, " {ip}")?;
                any = true;
            }
            if !any {
                f.write_str(" <none>")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
