//! Admission-controlled query scheduling.
//!
//! The [`QueryScheduler`] is the only gate between the lazy address supply
//! and the resolver: it pulls an address only while fewer than
//! `max_in_flight` lookups are outstanding, and otherwise sleeps on the
//! resolver channel until a completion frees a slot or a deadline passes.
//!
//! Results are reported in completion order. Nothing is buffered to restore
//! submission order.

use std::io::Write;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{debug, trace, warn};

use crate::report::ResultReporter;
use crate::resolver::{QueryResult, Resolver};

/// Counters describing a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lookups accepted by the resolver.
    pub submitted: usize,
    /// Lookups that came back from the resolver.
    pub completed: usize,
    /// Addresses the resolver refused to take.
    pub failed_submissions: usize,
    /// Highest number of lookups outstanding at once.
    pub peak_in_flight: usize,
}

pub struct QueryScheduler<R, W: Write> {
    resolver: R,
    reporter: ResultReporter<W>,
    max_in_flight: usize,
    in_flight: usize,
    summary: RunSummary,
}

impl<R: Resolver, W: Write> QueryScheduler<R, W> {
    /// A limit of 0 is raised to 1 so the run can make progress, and a limit
    /// above what the resolver can hold is lowered to its capacity.
    pub fn new(resolver: R, reporter: ResultReporter<W>, max_in_flight: usize) -> Self {
        let capacity = resolver.capacity().max(1);
        if max_in_flight > capacity {
            warn!("at most {capacity} queries can be in flight, lowering limit from {max_in_flight}");
        }
        Self {
            resolver,
            reporter,
            max_in_flight: max_in_flight.clamp(1, capacity),
            in_flight: 0,
            summary: RunSummary::default(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Resolves every address from `addresses`, returning once the supply is
    /// exhausted and no lookup is outstanding.
    ///
    /// Per-address failures are reported and never end the run; only a
    /// failure to write a result does.
    pub async fn run<I>(&mut self, addresses: I) -> anyhow::Result<RunSummary>
    where
        I: IntoIterator<Item = Ipv4Addr>,
    {
        let mut addresses = addresses.into_iter();
        let mut exhausted = false;

        loop {
            if !exhausted && self.in_flight < self.max_in_flight {
                match addresses.next() {
                    Some(addr) => self.submit(addr).await?,
                    None => {
                        exhausted = true;
                        debug!("address range exhausted, {} queries outstanding", self.in_flight);
                    }
                }
            }

            if self.in_flight == 0 {
                if exhausted {
                    break;
                }
                continue;
            }

            // While more work can be admitted only peek at the channel, so a
            // slow lookup never holds back the next submission.
            let admitting = !exhausted && self.in_flight < self.max_in_flight;
            let timeout: Option<Duration> = if admitting {
                Some(Duration::ZERO)
            } else {
                self.resolver.next_timeout(Instant::now())
            };

            let ready = self.resolver.wait_for_events(timeout).await;
            trace!(ready, ?timeout, in_flight = self.in_flight, "polled resolver");

            for result in self.resolver.process_events(Instant::now()) {
                self.complete(result)?;
            }
        }

        debug_assert_eq!(self.resolver.pending(), 0);
        Ok(self.summary)
    }

    async fn submit(&mut self, addr: Ipv4Addr) -> anyhow::Result<()> {
        match self.resolver.submit(addr).await {
            Ok(()) => {
                self.in_flight += 1;
                self.summary.submitted += 1;
                self.summary.peak_in_flight = self.summary.peak_in_flight.max(self.in_flight);
                debug_assert!(self.in_flight <= self.max_in_flight);
            }
            Err(e) => {
                warn!("{addr}: {e}");
                self.summary.failed_submissions += 1;
                self.report(&QueryResult::failed(addr, e.kind()))?;
                // Nothing else awaits while no query is out; let the runtime breathe.
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }

    fn complete(&mut self, result: QueryResult) -> anyhow::Result<()> {
        match self.in_flight.checked_sub(1) {
            Some(in_flight) => {
                self.in_flight = in_flight;
                self.summary.completed += 1;
            }
            None => warn!("{}: completion without an outstanding query", result.addr),
        }
        self.report(&result)
    }

    fn report(&mut self, result: &QueryResult) -> anyhow::Result<()> {
        self.reporter
            .report(result)
            .with_context(|| format!("writing result for {}", result.addr))
    }

    pub fn into_parts(self) -> (R, ResultReporter<W>) {
        (self.resolver, self.reporter)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
