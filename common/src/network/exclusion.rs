//! # Per-octet Exclusion Filter
//!
//! An exclusion spec names octet values that must not be queried, one
//! dot-separated field per octet position:
//!
//! * `"10"` excludes every address whose first octet is 10.
//! * `"..4."` excludes every address whose third octet is 4.
//! * `"..4,5.255"` excludes third octets 4 and 5 and the last address of
//!   every /24.
//!
//! Inside a field any run of digits is a value and every other character
//! separates values. An empty field excludes nothing.
//!
//! Matching is hierarchical: a hit on a higher-order octet prunes the whole
//! block below it, so the range iterator can jump past a /8, /16 or /24 in
//! one step instead of testing each address.

use std::str::FromStr;

use crate::error::ExclusionError;

const OCTETS: usize = 4;

/// Which octet values are excluded at each of the four positions.
#[derive(Clone, PartialEq, Eq)]
pub struct ExclusionTable {
    excluded: [[bool; 256]; OCTETS],
}

impl ExclusionTable {
    pub fn new() -> Self {
        Self {
            excluded: [[false; 256]; OCTETS],
        }
    }

    /// Marks `value` as excluded at octet `position` (0 is the most significant).
    pub fn exclude(&mut self, position: usize, value: u8) {
        self.excluded[position][value as usize] = true;
    }

    pub fn is_excluded(&self, position: usize, value: u8) -> bool {
        self.excluded[position][value as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.iter().flatten().all(|excluded| !excluded)
    }

    /// Checks `addr` against the table, highest-order octet first.
    ///
    /// Returns the number of addresses after `addr` that belong to the same
    /// excluded block: up to the end of the /8, /16 or /24 for a hit on
    /// octet 0, 1 or 2, and 0 for a hit on the last octet. `None` means the
    /// address is not excluded.
    pub fn matches(&self, addr: u32) -> Option<u32> {
        (0..OCTETS).find_map(|position| {
            let shift: u32 = 8 * (OCTETS - 1 - position) as u32;
            let octet: u8 = (addr >> shift) as u8;
            if !self.is_excluded(position, octet) {
                return None;
            }
            let host_mask: u32 = (1u32 << shift) - 1;
            Some((addr | host_mask) - addr)
        })
    }
}

impl Default for ExclusionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ExclusionTable {
    type Err = ExclusionError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = spec.split('.').collect();
        if fields.len() > OCTETS {
            return Err(ExclusionError::TooManyFields(fields.len()));
        }

        let mut table = ExclusionTable::new();
        for (position, field) in fields.iter().enumerate() {
            let values = field
                .split(|c: char| !c.is_ascii_digit())
                .filter(|digits| !digits.is_empty());

            for digits in values {
                let value: u8 = digits
                    .parse()
                    .map_err(|_| ExclusionError::OctetOutOfRange {
                        position,
                        value: digits.to_string(),
                    })?;
                table.exclude(position, value);
            }
        }

        Ok(table)
    }
}

impl std::fmt::Debug for ExclusionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<String> = self
            .excluded
            .iter()
            .map(|values| {
                values
                    .iter()
                    .enumerate()
                    .filter(|(_, excluded)| **excluded)
                    .map(|(value, _)| value.to_string())
                    .collect::<Vec<String>>()
                    .join(",")
            })
            .collect();
        write!(f, "ExclusionTable({})", fields.join("."))
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
