//! Single-pass resolution: every CNAME, MX, A and AAAA lookup is in flight at
//! once over one channel, and answers are dispatched by query id as they
//! arrive, in any order.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, trace};

use crate::envelope::split_address;
use crate::local_addrs::LocalAddresses;

use super::{
    QueryId, Readiness, RecordKind, ResolveError, ResolvedSet, ResolverChannel, assemble, decode,
};

/// CNAME redirects followed per recipient before giving up.
pub const MAX_CNAME_HOPS: u16 = 100;

/// What an in-flight query is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Mx,
    Cname(usize),
    Address(usize, Family),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    V4,
    V6,
}

#[derive(Debug)]
pub(crate) struct RecipientState {
    /// Current domain; replaced by each CNAME target. Empty when the address
    /// has no domain part.
    pub domain: String,
    /// Offset of the last '@', if any.
    pub at_offset: Option<usize>,
    pub pending: Option<QueryId>,
    pub hops: u16,
}

impl RecipientState {
    fn new(address: &str) -> Self {
        let (at_offset, domain) = match split_address(address) {
            Some((local, domain)) => (Some(local.len()), domain.to_string()),
            None => (None, String::new()),
        };
        Self {
            domain,
            at_offset,
            pending: None,
            hops: 0,
        }
    }

    pub fn has_domain(&self) -> bool {
        !self.domain.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct ExchangerState {
    pub name: String,
    pub v4: Vec<[u8; 4]>,
    pub v6: Vec<[u8; 16]>,
    pub pending_v4: Option<QueryId>,
    pub pending_v6: Option<QueryId>,
}

/// Per-call resolution state. Trackers live exactly as long as one call.
pub(crate) struct Engine<'a, C> {
    channel: C,
    host: &'a str,
    deadline: Instant,
    local: &'a LocalAddresses,
    ipv6: bool,
    pending: HashMap<QueryId, Pending>,
    recipients: Vec<RecipientState>,
    exchangers: Vec<ExchangerState>,
}

impl<'a, C: ResolverChannel> Engine<'a, C> {
    pub fn new(
        channel: C,
        host: &'a str,
        deadline: Instant,
        local: &'a LocalAddresses,
        ipv6: bool,
    ) -> Self {
        Self {
            channel,
            host,
            deadline,
            local,
            ipv6,
            pending: HashMap::new(),
            recipients: Vec::new(),
            exchangers: Vec::new(),
        }
    }

    pub fn run<S: AsRef<str>>(
        mut self,
        addresses: &[S],
        direct: bool,
    ) -> Result<ResolvedSet, ResolveError> {
        self.recipients = addresses
            .iter()
            .map(|a| RecipientState::new(a.as_ref()))
            .collect();

        for index in 0..self.recipients.len() {
            if self.recipients[index].has_domain() {
                let domain = self.recipients[index].domain.clone();
                let id = self.submit(&domain, RecordKind::Cname, Pending::Cname(index))?;
                self.recipients[index].pending = Some(id);
            }
        }

        if direct {
            self.use_host_as_exchanger()?;
        } else {
            let host = self.host;
            self.submit(host, RecordKind::Mx, Pending::Mx)?;
        }

        while !self.pending.is_empty() {
            trace!(pending = self.pending.len(), "waiting for DNS answers");
            match self
                .channel
                .wait_readable(self.deadline)
                .map_err(|err| ResolveError::channel("wait for DNS answers", err))?
            {
                Readiness::Ready => {}
                Readiness::TimedOut => return Err(ResolveError::Timeout),
            }
            let answers = self
                .channel
                .drain()
                .map_err(|err| ResolveError::channel("read DNS answers", err))?;
            for (id, packet) in answers {
                self.dispatch(id, &packet)?;
            }
        }

        debug!(
            recipients = self.recipients.len(),
            exchangers = self.exchangers.len(),
            "DNS resolution complete"
        );
        Ok(assemble::assemble(
            addresses,
            &self.recipients,
            &self.exchangers,
        ))
    }

    fn submit(&mut self, name: &str, kind: RecordKind, tag: Pending) -> Result<QueryId, ResolveError> {
        let query_name = query_name(name).map_err(|err| ResolveError::submit(kind, name, err))?;
        let id = self
            .channel
            .submit(&query_name, kind, self.deadline)
            .map_err(|err| ResolveError::submit(kind, name, err))?;
        debug!(%kind, domain = name, %id, "sending DNS query");
        if self.pending.insert(id, tag).is_some() {
            return Err(ResolveError::DuplicateQuery(id));
        }
        Ok(id)
    }

    /// The host itself becomes the only exchanger (routing override, or no MX).
    fn use_host_as_exchanger(&mut self) -> Result<(), ResolveError> {
        let host = self.host;
        self.exchangers = vec![ExchangerState {
            name: host.to_string(),
            ..ExchangerState::default()
        }];
        self.submit_addresses(0)
    }

    fn submit_addresses(&mut self, index: usize) -> Result<(), ResolveError> {
        let name = self.exchangers[index].name.clone();
        let id = self.submit(&name, RecordKind::A, Pending::Address(index, Family::V4))?;
        self.exchangers[index].pending_v4 = Some(id);
        if self.ipv6 {
            let id = self.submit(&name, RecordKind::Aaaa, Pending::Address(index, Family::V6))?;
            self.exchangers[index].pending_v6 = Some(id);
        }
        Ok(())
    }

    fn dispatch(&mut self, id: QueryId, packet: &[u8]) -> Result<(), ResolveError> {
        let Some(tag) = self.pending.remove(&id) else {
            return Err(ResolveError::UnknownQuery(id));
        };
        trace!(%id, ?tag, "received DNS answer");
        match tag {
            Pending::Mx => self.on_mx(packet),
            Pending::Cname(index) => self.on_cname(index, packet),
            Pending::Address(index, Family::V4) => self.on_a(index, packet),
            Pending::Address(index, Family::V6) => self.on_aaaa(index, packet),
        }
    }

    fn on_cname(&mut self, index: usize, packet: &[u8]) -> Result<(), ResolveError> {
        let domain = self.recipients[index].domain.clone();
        match decode::cname(packet)
            .map_err(|err| ResolveError::decode(RecordKind::Cname, &domain, err))?
        {
            Some(target) => {
                let state = &mut self.recipients[index];
                state.hops += 1;
                if state.hops > MAX_CNAME_HOPS {
                    return Err(ResolveError::CnameLoop { name: domain });
                }
                debug!(from = %domain, to = %target, hops = state.hops, "following CNAME");
                let id = self.submit(&target, RecordKind::Cname, Pending::Cname(index))?;
                let state = &mut self.recipients[index];
                state.pending = Some(id);
                state.domain = target;
            }
            None => {
                trace!(%domain, "canonical name reached");
                self.recipients[index].pending = None;
            }
        }
        Ok(())
    }

    fn on_mx(&mut self, packet: &[u8]) -> Result<(), ResolveError> {
        let mut records = decode::mx(packet)
            .map_err(|err| ResolveError::decode(RecordKind::Mx, self.host, err))?;
        if records.is_empty() {
            debug!(host = self.host, "no MX records, using host as exchanger");
            return self.use_host_as_exchanger();
        }
        // Stable: equal preferences keep answer order.
        records.sort_by_key(|record| record.preference);
        self.exchangers = records
            .into_iter()
            .map(|record| ExchangerState {
                name: record.exchange,
                ..ExchangerState::default()
            })
            .collect();
        for index in 0..self.exchangers.len() {
            self.submit_addresses(index)?;
        }
        Ok(())
    }

    fn on_a(&mut self, index: usize, packet: &[u8]) -> Result<(), ResolveError> {
        let exchanger = &mut self.exchangers[index];
        let addrs = decode::a(packet)
            .map_err(|err| ResolveError::decode(RecordKind::A, &exchanger.name, err))?;
        exchanger.pending_v4 = None;
        for ip in addrs {
            let octets = ip.octets();
            if self.local.contains_v4(&octets) {
                debug!(exchanger = %exchanger.name, %ip, "skipping local address");
                continue;
            }
            exchanger.v4.push(octets);
        }
        Ok(())
    }

    fn on_aaaa(&mut self, index: usize, packet: &[u8]) -> Result<(), ResolveError> {
        let exchanger = &mut self.exchangers[index];
        let addrs = decode::aaaa(packet)
            .map_err(|err| ResolveError::decode(RecordKind::Aaaa, &exchanger.name, err))?;
        exchanger.pending_v6 = None;
        for ip in addrs {
            let octets = ip.octets();
            if self.local.contains_v6(&octets) {
                debug!(exchanger = %exchanger.name, %ip, "skipping local address");
                continue;
            }
            exchanger.v6.push(octets);
        }
        Ok(())
    }
}

/// ASCII (IDNA) form of a domain, as sent on the wire.
fn query_name(domain: &str) -> Result<String, super::ChannelError> {
    let trimmed = domain.trim();
    if trimmed.is_ascii() {
        return Ok(trimmed.to_string());
    }
    idna::domain_to_ascii(trimmed).map_err(|err| super::ChannelError::invalid_name(trimmed, err))
}
