//! Resolver configuration.
//!
//! Mirrors the parts of `/etc/resolv.conf` that matter to a stub resolver
//! sending PTR queries: the nameserver list and the `timeout`, `attempts`
//! and `rotate` options. Everything else in the file is ignored.

use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::SplitWhitespace;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

pub const DNS_PORT: u16 = 53;
pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

#[derive(Debug, Error)]
pub enum ConfError {
    #[error("unable to read resolver configuration: {0}")]
    Io(#[from] io::Error),

    #[error("invalid nameserver address: {0}")]
    InvalidServer(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverConf {
    /// Addresses of servers to query, in order of preference.
    pub servers: Vec<SocketAddr>,

    /// Time to wait for a response before trying the next server.
    pub timeout: Duration,

    /// Number of passes over the server list before giving up.
    pub attempts: usize,

    /// Spread queries over the servers instead of always starting with the
    /// first one.
    pub rotate: bool,

    /// Set the RD bit on queries.
    pub recurse: bool,
}

impl ResolverConf {
    /// Creates a configuration without any nameserver.
    ///
    /// Call [`ResolverConf::finalize`] before use.
    pub fn new() -> Self {
        Self {
            servers: Vec::new(),
            timeout: Duration::from_secs(5),
            attempts: 2,
            rotate: false,
            recurse: true,
        }
    }

    /// Reads the system configuration at `path`, falling back to defaults
    /// when it is missing or unreadable.
    pub fn system<P: AsRef<Path>>(path: P) -> Self {
        let mut conf = Self::new();
        if let Err(e) = conf.parse_file(path.as_ref()) {
            warn!("{}: {e}, using defaults", path.as_ref().display());
        }
        conf
    }

    /// Falls back to `127.0.0.1:53` when no server was configured, like glibc.
    pub fn finalize(&mut self) {
        if self.servers.is_empty() {
            self.servers
                .push(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DNS_PORT));
        }
        self.attempts = self.attempts.max(1);
    }

    /// Total number of tries a single query may use.
    pub fn max_tries(&self) -> usize {
        self.attempts.max(1) * self.servers.len().max(1)
    }

    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfError> {
        let mut file = fs::File::open(path)?;
        self.parse(&mut file)
    }

    /// Parses configuration in `resolv.conf` format.
    pub fn parse<R: Read>(&mut self, reader: &mut R) -> Result<(), ConfError> {
        for line in BufReader::new(reader).lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let mut words = line.split_whitespace();
            match words.next() {
                Some("nameserver") => self.parse_nameserver(words),
                Some("options") => self.parse_options(words),
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_nameserver(&mut self, mut words: SplitWhitespace) {
        let Some(word) = words.next() else {
            return;
        };
        match word.parse::<IpAddr>() {
            Ok(ip) => self.servers.push(SocketAddr::new(ip, DNS_PORT)),
            // Scoped IPv6 addresses and the like cannot be used from here.
            Err(_) => debug!("skipping nameserver entry {word}"),
        }
    }

    fn parse_options(&mut self, words: SplitWhitespace) {
        for word in words {
            let (name, arg) = match word.split_once(':') {
                Some((name, arg)) => (name, arg.parse::<u64>().ok()),
                None => (word, None),
            };
            match (name, arg) {
                ("timeout", Some(secs)) => self.timeout = Duration::from_secs(secs.max(1)),
                ("attempts", Some(n)) => self.attempts = n.max(1) as usize,
                ("rotate", None) => self.rotate = true,
                // Ignore unknown or misformatted options.
                _ => {}
            }
        }
    }
}

impl Default for ResolverConf {
    fn default() -> Self {
        let mut conf = Self::new();
        conf.finalize();
        conf
    }
}

/// Parses a nameserver given as `ADDR` or `ADDR:PORT` (`[V6]:PORT` for IPv6).
pub fn parse_server(s: &str) -> Result<SocketAddr, ConfError> {
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(addr);
    }
    s.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| ConfError::InvalidServer(s.to_string()))
}
