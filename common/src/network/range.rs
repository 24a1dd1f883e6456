use std::iter::FusedIterator;
use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;

use crate::error::RangeError;
use crate::network::address::{denumberize, numberize};
use crate::network::exclusion::ExclusionTable;

/// An inclusive interval of IPv4 addresses walked with a fixed step.
///
/// Only the constructors can set the endpoints, so `start_addr <= end_addr`
/// holds for every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    start_addr: Ipv4Addr,
    end_addr: Ipv4Addr,
    increment: u32,
}

impl AddressRange {
    /// Builds a range with an increment of 1.
    ///
    /// Fails when `start_addr` is greater than `end_addr`.
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Result<Self, RangeError> {
        if u32::from(start_addr) > u32::from(end_addr) {
            return Err(RangeError::RangeOrderError {
                start: start_addr.to_string(),
                end: end_addr.to_string(),
            });
        }
        Ok(Self {
            start_addr,
            end_addr,
            increment: 1,
        })
    }

    /// Builds the range covered by the CIDR block `base/prefix_len`.
    ///
    /// The base must sit on the subnet boundary: `10.0.0.1/24` is rejected
    /// rather than silently truncated to `10.0.0.0/24`.
    pub fn from_cidr(base: &str, prefix_len: i64) -> Result<Self, RangeError> {
        let base_addr = Ipv4Addr::from(numberize(base)?);
        let prefix: u8 = u8::try_from(prefix_len)
            .ok()
            .filter(|prefix| *prefix <= 32)
            .ok_or_else(|| RangeError::InvalidPrefix(prefix_len.to_string()))?;

        let network = Ipv4Network::new(base_addr, prefix)
            .map_err(|_| RangeError::InvalidPrefix(prefix_len.to_string()))?;

        if network.network() != base_addr {
            return Err(RangeError::MisalignedSubnet {
                base: base.to_string(),
                prefix,
            });
        }

        Self::new(network.network(), network.broadcast())
    }

    /// Builds the range between two dotted-decimal endpoints, both inclusive.
    pub fn from_pair(start: &str, end: &str) -> Result<Self, RangeError> {
        let start_addr = numberize(start)?;
        let end_addr = numberize(end)?;
        Self::new(start_addr.into(), end_addr.into())
    }

    /// Replaces the step between consecutive addresses.
    pub fn with_increment(self, increment: i64) -> Result<Self, RangeError> {
        let increment: u32 = u32::try_from(increment)
            .ok()
            .filter(|step| *step >= 1)
            .ok_or(RangeError::NonPositiveIncrement(increment))?;
        Ok(Self { increment, ..self })
    }

    pub fn start_addr(&self) -> Ipv4Addr {
        self.start_addr
    }

    pub fn end_addr(&self) -> Ipv4Addr {
        self.end_addr
    }

    pub fn increment(&self) -> u32 {
        self.increment
    }

    /// Number of addresses the range visits before any exclusion is applied.
    pub fn len(&self) -> u64 {
        let span: u64 = u64::from(u32::from(self.end_addr)) - u64::from(u32::from(self.start_addr));
        span / u64::from(self.increment) + 1
    }

    /// A range always holds at least its start address.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn to_iter(self, exclusions: Option<ExclusionTable>) -> RangeIterator {
        RangeIterator::new(self, exclusions)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {}",
            denumberize(self.start_addr.into()),
            denumberize(self.end_addr.into())
        )
    }
}

/// Lazily walks an [`AddressRange`], leaving out excluded addresses.
///
/// Candidates are `start + k * increment` for `k = 0, 1, ...` up to `end`.
/// When a candidate falls into an excluded block the cursor jumps to the
/// first candidate past that block, so a pruned /8 costs one step rather
/// than sixteen million.
#[derive(Debug, Clone)]
pub struct RangeIterator {
    range: AddressRange,
    exclusions: Option<ExclusionTable>,
    // u64 so that stepping past 255.255.255.255 terminates instead of wrapping.
    cursor: u64,
}

impl RangeIterator {
    pub fn new(range: AddressRange, exclusions: Option<ExclusionTable>) -> Self {
        let exclusions = exclusions.filter(|table| !table.is_empty());
        Self {
            cursor: u64::from(u32::from(range.start_addr)),
            range,
            exclusions,
        }
    }

    pub fn range(&self) -> &AddressRange {
        &self.range
    }

    fn end(&self) -> u64 {
        u64::from(u32::from(self.range.end_addr))
    }

    /// First lattice point strictly after `last`.
    fn next_candidate_after(&self, last: u64) -> u64 {
        let start: u64 = u64::from(u32::from(self.range.start_addr));
        let step: u64 = u64::from(self.range.increment);
        start + ((last - start) / step + 1) * step
    }
}

impl Iterator for RangeIterator {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor <= self.end() {
            let current: u32 = self.cursor as u32;

            match self.exclusions.as_ref().and_then(|table| table.matches(current)) {
                Some(skip) => {
                    let block_end: u64 = u64::from(current) + u64::from(skip);
                    self.cursor = self.next_candidate_after(block_end);
                }
                None => {
                    self.cursor += u64::from(self.range.increment);
                    return Some(Ipv4Addr::from(current));
                }
            }
        }
        None
    }
}

impl FusedIterator for RangeIterator {}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
