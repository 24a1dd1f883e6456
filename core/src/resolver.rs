//! The name-resolution **abstraction** the scheduler drives.
//!
//! A [`Resolver`] owns one non-blocking channel to its nameservers and any
//! number of outstanding PTR queries. It never blocks on its own: the
//! scheduler asks how long it may sleep ([`Resolver::next_timeout`]), waits
//! for the channel ([`Resolver::wait_for_events`]), and then lets the
//! resolver settle whatever became ready ([`Resolver::process_events`]).
//!
//! Finished lookups are handed back as plain [`QueryResult`] values rather
//! than through callbacks, so the scheduler keeps full control of its state.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

pub mod conf;
pub mod udp;

pub use udp::UdpResolver;

/// Why a lookup did not produce names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TemporaryFailure,
    ProtocolError,
    NameNotFound,
    NoData,
    OutOfMemory,
    MalformedQuery,
    Unclassified,
}

impl ErrorKind {
    /// The token printed in place of a name.
    pub fn token(&self) -> &'static str {
        match self {
            ErrorKind::TemporaryFailure => "TEMPFAIL",
            ErrorKind::ProtocolError => "PROTOERR",
            ErrorKind::NameNotFound => "NXDOMAIN",
            ErrorKind::NoData => "NODATA",
            ErrorKind::OutOfMemory => "NOMEM",
            ErrorKind::MalformedQuery => "BADQUERY",
            ErrorKind::Unclassified => "NOERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Names(Vec<String>),
    Error(ErrorKind),
}

/// One settled lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub addr: Ipv4Addr,
    pub outcome: Outcome,
}

impl QueryResult {
    pub fn names(addr: Ipv4Addr, names: Vec<String>) -> Self {
        Self {
            addr,
            outcome: Outcome::Names(names),
        }
    }

    pub fn failed(addr: Ipv4Addr, kind: ErrorKind) -> Self {
        Self {
            addr,
            outcome: Outcome::Error(kind),
        }
    }
}

/// A query that could not even be handed to the network.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("unable to encode query: {0}")]
    BadQuery(String),

    #[error("unable to send query: {0}")]
    Send(#[from] std::io::Error),

    #[error("too many queries outstanding")]
    QueueFull,
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitError::BadQuery(_) => ErrorKind::MalformedQuery,
            SubmitError::Send(_) | SubmitError::QueueFull => ErrorKind::TemporaryFailure,
        }
    }
}

/// Resolver setup failed; nothing can be queried.
#[derive(Debug, Error)]
pub enum ResolverInitError {
    #[error("no usable nameserver configured")]
    NoNameservers,

    #[error("unable to open resolver socket: {0}")]
    Bind(#[from] std::io::Error),
}

/// Non-blocking PTR lookups over a single multiplexed channel.
#[async_trait]
pub trait Resolver: Send {
    /// Starts a lookup for `addr`.
    ///
    /// On `Ok` the lookup is pending and will eventually come back from
    /// [`Resolver::process_events`] exactly once. On `Err` nothing is pending.
    /// Waits for the channel to accept the query rather than failing when it
    /// is momentarily busy.
    async fn submit(&mut self, addr: Ipv4Addr) -> Result<(), SubmitError>;

    /// Number of lookups submitted but not yet returned.
    fn pending(&self) -> usize;

    /// Most lookups that can be pending at once.
    fn capacity(&self) -> usize {
        usize::MAX
    }

    /// Time until the earliest pending deadline, `None` when idle.
    fn next_timeout(&self, now: Instant) -> Option<Duration>;

    /// Waits until the channel is readable or `timeout` elapses.
    ///
    /// `None` waits without limit. Returns whether the channel became ready.
    async fn wait_for_events(&mut self, timeout: Option<Duration>) -> bool;

    /// Consumes ready input and expired deadlines, returning every lookup
    /// that settled as a result.
    fn process_events(&mut self, now: Instant) -> Vec<QueryResult>;
}
