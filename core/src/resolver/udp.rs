use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rdns_protocols::dns::{self, Rcode};
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use super::conf::ResolverConf;
use super::{ErrorKind, QueryResult, Resolver, ResolverInitError, SubmitError};

const RECV_BUFFER_SIZE: usize = 4096;
const MAX_PENDING: usize = u16::MAX as usize;

struct PendingQuery {
    addr: Ipv4Addr,
    packet: Vec<u8>,
    first_server: usize,
    tries: usize,
    deadline: Instant,
}

/// Stub resolver multiplexing every PTR query over one UDP socket.
///
/// Queries are matched to replies by transaction id, source server and
/// question name. A query that times out, meets `SERVFAIL`, `REFUSED` or
/// `NOTIMP`, or gets a truncated reply without names moves on to the next
/// server until `attempts` passes over the server list are used up.
pub struct UdpResolver {
    socket: UdpSocket,
    conf: ResolverConf,
    pending: HashMap<u16, PendingQuery>,
    submitted: usize,
}

impl UdpResolver {
    /// Opens the resolver socket.
    ///
    /// The socket uses the address family of the first nameserver; servers
    /// of the other family are dropped.
    pub async fn bind(mut conf: ResolverConf) -> Result<Self, ResolverInitError> {
        let Some(first) = conf.servers.first().copied() else {
            return Err(ResolverInitError::NoNameservers);
        };

        let (usable, foreign): (Vec<SocketAddr>, Vec<SocketAddr>) = conf
            .servers
            .iter()
            .partition(|server| server.is_ipv4() == first.is_ipv4());
        for server in foreign {
            warn!("ignoring nameserver {server}, address family differs from {first}");
        }
        conf.servers = usable;

        let local: SocketAddr = if first.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local).await?;
        // Registers write readiness, which the non-blocking resends rely on.
        socket.writable().await?;
        debug!(
            "resolver bound to {} using {:?}",
            socket.local_addr()?,
            conf.servers
        );

        Ok(Self {
            socket,
            conf,
            pending: HashMap::new(),
            submitted: 0,
        })
    }

    pub fn conf(&self) -> &ResolverConf {
        &self.conf
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn next_id(&self) -> u16 {
        loop {
            let id: u16 = rand::random();
            if !self.pending.contains_key(&id) {
                return id;
            }
        }
    }

    fn server_for(&self, first_server: usize, tries: usize) -> SocketAddr {
        let servers = &self.conf.servers;
        servers[(first_server + tries - 1) % servers.len()]
    }

    fn handle_datagram(
        &mut self,
        payload: &[u8],
        from: SocketAddr,
        now: Instant,
        done: &mut Vec<QueryResult>,
    ) {
        if !self.conf.servers.contains(&from) {
            trace!("dropping datagram from unknown source {from}");
            return;
        }
        let Some(id) = dns::response_id(payload) else {
            return;
        };
        let Some(addr) = self.pending.get(&id).map(|query| query.addr) else {
            trace!("dropping reply {id} from {from}, no such query");
            return;
        };

        let response = match dns::parse_ptr_response(payload) {
            Ok(response) => response,
            Err(e) => {
                debug!("undecodable reply for {addr} from {from}: {e:#}");
                self.finish(id, QueryResult::failed(addr, ErrorKind::ProtocolError), done);
                return;
            }
        };

        if !response.answers(addr) {
            trace!("reply {id} from {from} does not answer {addr}");
            return;
        }

        let result = match response.rcode {
            Rcode::NoError if !response.names.is_empty() => QueryResult::names(addr, response.names),
            // An empty truncated answer says nothing about whether a record exists.
            Rcode::NoError if response.truncated => {
                debug!("{from} sent a truncated reply without names for {addr}");
                self.retry_or_fail(id, now, done);
                return;
            }
            Rcode::NoError => QueryResult::failed(addr, ErrorKind::NoData),
            Rcode::NameError => QueryResult::failed(addr, ErrorKind::NameNotFound),
            Rcode::FormatError => QueryResult::failed(addr, ErrorKind::MalformedQuery),
            Rcode::ServerFailure | Rcode::Refused | Rcode::NotImplemented => {
                debug!("{from} answered {addr} with {:?}", response.rcode);
                self.retry_or_fail(id, now, done);
                return;
            }
            Rcode::Other(code) => {
                debug!("{from} answered {addr} with reserved rcode {code}");
                QueryResult::failed(addr, ErrorKind::Unclassified)
            }
        };
        self.finish(id, result, done);
    }

    fn retry_or_fail(&mut self, id: u16, now: Instant, done: &mut Vec<QueryResult>) {
        let max_tries = self.conf.max_tries();
        let Some(query) = self.pending.get(&id) else {
            return;
        };

        if query.tries >= max_tries {
            let addr = query.addr;
            self.finish(id, QueryResult::failed(addr, ErrorKind::TemporaryFailure), done);
            return;
        }

        let server = self.server_for(query.first_server, query.tries + 1);
        let timeout = self.conf.timeout;
        if let Some(query) = self.pending.get_mut(&id) {
            query.tries += 1;
            query.deadline = now + timeout;
            trace!("retrying {} via {server}, try {}", query.addr, query.tries);
            // A failed resend just runs into the deadline again.
            if let Err(e) = self.socket.try_send_to(&query.packet, server) {
                debug!("resend of {} to {server} failed: {e}", query.addr);
            }
        }
    }

    fn finish(&mut self, id: u16, result: QueryResult, done: &mut Vec<QueryResult>) {
        if self.pending.remove(&id).is_some() {
            done.push(result);
        }
    }
}

#[async_trait]
impl Resolver for UdpResolver {
    async fn submit(&mut self, addr: Ipv4Addr) -> Result<(), SubmitError> {
        if self.pending.len() >= MAX_PENDING {
            return Err(SubmitError::QueueFull);
        }

        let id = self.next_id();
        let packet = dns::create_ptr_packet(addr, id, self.conf.recurse)
            .map_err(|e| SubmitError::BadQuery(format!("{e:#}")))?;

        let first_server = if self.conf.rotate {
            self.submitted % self.conf.servers.len()
        } else {
            0
        };
        let server = self.server_for(first_server, 1);
        self.socket.send_to(&packet, server).await?;
        self.submitted += 1;
        trace!("query {id} for {addr} sent to {server}");

        self.pending.insert(
            id,
            PendingQuery {
                addr,
                packet,
                first_server,
                tries: 1,
                deadline: Instant::now() + self.conf.timeout,
            },
        );
        Ok(())
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    /// One pending query per transaction id.
    fn capacity(&self) -> usize {
        MAX_PENDING
    }

    fn next_timeout(&self, now: Instant) -> Option<Duration> {
        self.pending
            .values()
            .map(|query| query.deadline)
            .min()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    async fn wait_for_events(&mut self, timeout: Option<Duration>) -> bool {
        let readable = self.socket.readable();
        match timeout {
            Some(limit) => matches!(tokio::time::timeout(limit, readable).await, Ok(Ok(()))),
            None => readable.await.is_ok(),
        }
    }

    fn process_events(&mut self, now: Instant) -> Vec<QueryResult> {
        let mut done: Vec<QueryResult> = Vec::new();
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, from)) => self.handle_datagram(&buf[..len], from, now, &mut done),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("receive failed: {e}");
                    break;
                }
            }
        }

        let expired: Vec<u16> = self
            .pending
            .iter()
            .filter(|(_, query)| query.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.retry_or_fail(id, now, &mut done);
        }

        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_requires_a_nameserver() {
        let result = UdpResolver::bind(ResolverConf::new()).await;
        assert!(matches!(result, Err(ResolverInitError::NoNameservers)));
    }

    #[tokio::test]
    async fn bind_keeps_one_address_family() {
        let mut conf = ResolverConf::new();
        conf.servers = vec![
            "127.0.0.1:53".parse().unwrap(),
            "[::1]:53".parse().unwrap(),
            "127.0.0.2:53".parse().unwrap(),
        ];
        let resolver = UdpResolver::bind(conf).await.unwrap();
        assert_eq!(
            resolver.conf().servers,
            vec![
                "127.0.0.1:53".parse::<SocketAddr>().unwrap(),
                "127.0.0.2:53".parse::<SocketAddr>().unwrap(),
            ]
        );
        assert!(resolver.local_addr().unwrap().is_ipv4());
    }

    #[tokio::test]
    async fn capacity_follows_transaction_ids() {
        let mut conf = ResolverConf::new();
        conf.servers = vec!["127.0.0.1:53".parse().unwrap()];
        let resolver = UdpResolver::bind(conf).await.unwrap();
        assert_eq!(resolver.capacity(), usize::from(u16::MAX));
    }

    #[tokio::test]
    async fn first_query_reaches_the_server() {
        let server = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        server.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut conf = ResolverConf::new();
        conf.servers = vec![server.local_addr().unwrap()];

        let mut resolver = UdpResolver::bind(conf).await.unwrap();
        resolver.submit(Ipv4Addr::new(192, 0, 2, 44)).await.unwrap();

        let mut buf = [0u8; 512];
        let (len, from) = server.recv_from(&mut buf).unwrap();
        assert_eq!(from.port(), resolver.local_addr().unwrap().port());
        assert!(len > 12);
        let qname = b"\x0244\x012\x010\x03192\x07in-addr\x04arpa\x00";
        assert_eq!(&buf[12..12 + qname.len()], qname);
    }

    #[tokio::test]
    async fn silent_server_ends_in_tempfail() {
        // Bound but never read, so every query goes unanswered.
        let silent = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut conf = ResolverConf::new();
        conf.servers = vec![silent.local_addr().unwrap()];
        conf.timeout = Duration::from_millis(20);
        conf.attempts = 2;

        let mut resolver = UdpResolver::bind(conf).await.unwrap();
        let addr = Ipv4Addr::new(192, 0, 2, 1);
        resolver.submit(addr).await.unwrap();
        assert_eq!(resolver.pending(), 1);

        let mut results = Vec::new();
        while results.is_empty() {
            let timeout = resolver.next_timeout(Instant::now());
            resolver.wait_for_events(timeout).await;
            results.extend(resolver.process_events(Instant::now()));
        }

        assert_eq!(results, vec![QueryResult::failed(addr, ErrorKind::TemporaryFailure)]);
        assert_eq!(resolver.pending(), 0);
        assert_eq!(resolver.next_timeout(Instant::now()), None);
    }
}
