use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, trace, warn};
use trust_dns_resolver::config::Protocol;
use trust_dns_resolver::proto::op::{Edns, Message, MessageType, OpCode, Query};
use trust_dns_resolver::proto::rr::Name;

use super::{ChannelError, QueryId, Readiness, RecordKind, ResolverChannel};

const MAX_PAYLOAD: u16 = 4096;
const HEADER_LEN: usize = 12;
/// Delay before the first retransmission; doubles on each attempt.
const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_MAX: Duration = Duration::from_secs(8);

#[derive(Debug)]
struct InFlight {
    query: Query,
    packet: Vec<u8>,
    /// Index of the server the last copy went to.
    server: usize,
    attempts: u32,
    resend_at: Instant,
    deadline: Instant,
}

/// [`ResolverChannel`] over one UDP socket talking to a list of recursive
/// nameservers. Query ids are random and unique among in-flight queries.
///
/// Unanswered queries are sent again with exponential backoff, each time to
/// the next server in the list. A truncated reply is retried over TCP.
#[derive(Debug)]
pub struct UdpChannel {
    socket: UdpSocket,
    servers: Vec<SocketAddr>,
    in_flight: HashMap<u16, InFlight>,
}

impl UdpChannel {
    pub fn connect(server: SocketAddr) -> Result<Self, ChannelError> {
        Self::with_servers([server])
    }

    /// Uses every server of the first server's address family, in order.
    pub fn with_servers(
        servers: impl IntoIterator<Item = SocketAddr>,
    ) -> Result<Self, ChannelError> {
        let mut servers = servers.into_iter();
        let first = servers.next().ok_or(ChannelError::NoNameserver)?;
        let mut usable = vec![first];
        for server in servers {
            if server.is_ipv4() != first.is_ipv4() {
                warn!(%server, "skipping nameserver of another address family");
            } else if !usable.contains(&server) {
                usable.push(server);
            }
        }

        let bind: SocketAddr = if first.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind).map_err(|source| ChannelError::Init { source })?;
        debug!(servers = ?usable, "DNS channel ready");
        Ok(Self {
            socket,
            servers: usable,
            in_flight: HashMap::new(),
        })
    }

    /// Uses the UDP nameservers of the system configuration.
    pub fn from_system_conf() -> Result<Self, ChannelError> {
        let (config, _) = trust_dns_resolver::system_conf::read_system_conf()
            .map_err(|source| ChannelError::Init { source })?;
        let servers: Vec<SocketAddr> = config
            .name_servers()
            .iter()
            .filter(|ns| ns.protocol == Protocol::Udp)
            .map(|ns| ns.socket_addr)
            .collect();
        Self::with_servers(servers)
    }

    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }

    fn fresh_id(&self) -> Result<u16, ChannelError> {
        if self.in_flight.len() > usize::from(u16::MAX) {
            return Err(ChannelError::Exhausted);
        }
        let mut rng = rand::thread_rng();
        loop {
            let id: u16 = rng.r#gen();
            if !self.in_flight.contains_key(&id) {
                return Ok(id);
            }
        }
    }

    fn resend_due(&mut self, now: Instant) {
        for (id, entry) in self.in_flight.iter_mut() {
            if entry.resend_at > now || now >= entry.deadline {
                continue;
            }
            entry.server = (entry.server + 1) % self.servers.len();
            entry.attempts += 1;
            entry.resend_at = now + backoff(entry.attempts);
            match send_to_any(&self.socket, &self.servers, entry) {
                Ok(()) => debug!(
                    id,
                    attempt = entry.attempts,
                    server = %self.servers[entry.server],
                    "retransmitting DNS query"
                ),
                Err(err) => debug!(id, error = %err, "DNS retransmission failed"),
            }
        }
    }

    /// Takes the in-flight entry a datagram answers, if it answers one.
    fn accept(&mut self, datagram: &[u8], peer: SocketAddr) -> Option<(u16, InFlight)> {
        if datagram.len() < HEADER_LEN {
            trace!(len = datagram.len(), "dropping short datagram");
            return None;
        }
        if !self.servers.contains(&peer) {
            trace!(%peer, "dropping datagram from unknown peer");
            return None;
        }
        let id = u16::from_be_bytes([datagram[0], datagram[1]]);
        let Some(entry) = self.in_flight.get(&id) else {
            trace!(id, "dropping datagram for no pending query");
            return None;
        };
        if !answers_query(datagram, &entry.query) {
            trace!(id, "dropping reply to another question");
            return None;
        }
        self.in_flight.remove(&id).map(|entry| (id, entry))
    }
}

fn backoff(attempts: u32) -> Duration {
    let shift = attempts.saturating_sub(1).min(3);
    RETRY_BASE.saturating_mul(1 << shift).min(RETRY_MAX)
}

/// Sends the query to its current server, moving on to the next ones if the
/// send itself fails.
fn send_to_any(socket: &UdpSocket, servers: &[SocketAddr], entry: &mut InFlight) -> io::Result<()> {
    let mut last = None;
    for step in 0..servers.len() {
        let index = (entry.server + step) % servers.len();
        match socket.send_to(&entry.packet, servers[index]) {
            Ok(_) => {
                entry.server = index;
                return Ok(());
            }
            Err(err) => {
                debug!(server = %servers[index], error = %err, "DNS send failed");
                last = Some(err);
            }
        }
    }
    Err(last.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no nameserver")))
}

/// The reply parses and carries exactly the question that was asked.
fn answers_query(reply: &[u8], query: &Query) -> bool {
    match Message::from_vec(reply) {
        Ok(message) => match message.queries() {
            [asked] => {
                asked.name() == query.name()
                    && asked.query_type() == query.query_type()
                    && asked.query_class() == query.query_class()
            }
            _ => false,
        },
        Err(_) => false,
    }
}

fn is_truncated(reply: &[u8]) -> bool {
    reply.len() > 2 && reply[2] & 0x02 != 0
}

/// Sends the query again over TCP (two-byte length prefix on both sides).
fn query_over_tcp(server: SocketAddr, entry: &InFlight) -> io::Result<Vec<u8>> {
    let remaining = entry.deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(io::ErrorKind::TimedOut.into());
    }
    let len = u16::try_from(entry.packet.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "query too large"))?;

    let mut stream = TcpStream::connect_timeout(&server, remaining)?;
    stream.set_read_timeout(Some(remaining))?;
    stream.set_write_timeout(Some(remaining))?;
    let mut framed = Vec::with_capacity(2 + entry.packet.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(&entry.packet);
    stream.write_all(&framed)?;

    let mut prefix = [0u8; 2];
    stream.read_exact(&mut prefix)?;
    let mut reply = vec![0u8; usize::from(u16::from_be_bytes(prefix))];
    stream.read_exact(&mut reply)?;
    Ok(reply)
}

/// Upgrades a truncated UDP reply to the full TCP answer. Falls back to the
/// truncated reply, which decodes as a temporary failure.
fn complete_over_tcp(id: u16, entry: &InFlight, server: SocketAddr, truncated: Vec<u8>) -> Vec<u8> {
    debug!(id, %server, "truncated DNS answer, retrying over TCP");
    match query_over_tcp(server, entry) {
        Ok(reply)
            if reply.len() >= HEADER_LEN
                && u16::from_be_bytes([reply[0], reply[1]]) == id
                && answers_query(&reply, &entry.query) =>
        {
            reply
        }
        Ok(_) => {
            warn!(id, %server, "TCP DNS answer does not match the query");
            truncated
        }
        Err(err) => {
            warn!(id, %server, error = %err, "TCP DNS query failed");
            truncated
        }
    }
}

fn encode_query(id: u16, name: &str, kind: RecordKind) -> Result<(Query, Vec<u8>), ChannelError> {
    let mut qname = if name.is_empty() {
        Name::root()
    } else {
        Name::from_ascii(name).map_err(|err| ChannelError::invalid_name(name, err))?
    };
    qname.set_fqdn(true);
    let query = Query::query(qname, kind.record_type());

    let mut edns = Edns::new();
    edns.set_max_payload(MAX_PAYLOAD);

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(query.clone());
    message.set_edns(edns);
    let packet = message
        .to_vec()
        .map_err(|err| ChannelError::invalid_name(name, err))?;
    Ok((query, packet))
}

impl ResolverChannel for UdpChannel {
    fn submit(
        &mut self,
        name: &str,
        kind: RecordKind,
        deadline: Instant,
    ) -> Result<QueryId, ChannelError> {
        let id = self.fresh_id()?;
        let (query, packet) = encode_query(id, name, kind)?;
        let mut entry = InFlight {
            query,
            packet,
            server: 0,
            attempts: 1,
            resend_at: Instant::now() + RETRY_BASE,
            deadline,
        };
        send_to_any(&self.socket, &self.servers, &mut entry).map_err(ChannelError::io)?;
        self.in_flight.insert(id, entry);
        Ok(QueryId(id))
    }

    fn wait_readable(&mut self, deadline: Instant) -> Result<Readiness, ChannelError> {
        let mut header = [0u8; HEADER_LEN];
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(Readiness::TimedOut);
            }
            self.resend_due(now);
            let wake = self
                .in_flight
                .values()
                .map(|entry| entry.resend_at)
                .filter(|at| *at > now)
                .fold(deadline, Instant::min);
            let timeout = wake
                .saturating_duration_since(now)
                .max(Duration::from_millis(1));
            self.socket
                .set_read_timeout(Some(timeout))
                .map_err(ChannelError::io)?;
            match self.socket.peek_from(&mut header) {
                Ok(_) => return Ok(Readiness::Ready),
                Err(err)
                    if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                // Windows reports a datagram larger than the peek buffer as an error.
                Err(err) if err.raw_os_error() == Some(10040) => return Ok(Readiness::Ready),
                Err(err) => return Err(ChannelError::io(err)),
            }
        }
    }

    fn drain(&mut self) -> Result<Vec<(QueryId, Vec<u8>)>, ChannelError> {
        self.socket.set_nonblocking(true).map_err(ChannelError::io)?;
        let mut accepted = Vec::new();
        let mut buf = vec![0u8; usize::from(u16::MAX)];
        let result = loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, peer)) => {
                    if let Some((id, entry)) = self.accept(&buf[..len], peer) {
                        accepted.push((id, entry, peer, buf[..len].to_vec()));
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(err) => break Err(ChannelError::io(err)),
            }
        };
        self.socket.set_nonblocking(false).map_err(ChannelError::io)?;
        result?;

        Ok(accepted
            .into_iter()
            .map(|(id, entry, peer, reply)| {
                let reply = if is_truncated(&reply) {
                    complete_over_tcp(id, &entry, peer, reply)
                } else {
                    reply
                };
                (QueryId(id), reply)
            })
            .collect())
    }
}
