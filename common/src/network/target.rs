//! # Range Target
//!
//! Turns the positional command-line tokens into an [`AddressRange`].
//!
//! Two shapes are accepted:
//! * A single CIDR block, e.g. `192.168.4.0/24`.
//! * A start and an end address, e.g. `10.0.0.1 10.0.0.50`.

use std::str::FromStr;

use crate::error::RangeError;
use crate::network::range::AddressRange;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Cidr { base: String, prefix_len: i64 },
    Pair { start: String, end: String },
}

impl Target {
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, RangeError> {
        match tokens {
            [cidr] => cidr.as_ref().parse(),
            [start, end] => Ok(Target::Pair {
                start: start.as_ref().to_string(),
                end: end.as_ref().to_string(),
            }),
            _ => Err(RangeError::TargetCount(tokens.len())),
        }
    }

    pub fn to_range(&self) -> Result<AddressRange, RangeError> {
        match self {
            Target::Cidr { base, prefix_len } => AddressRange::from_cidr(base, *prefix_len),
            Target::Pair { start, end } => AddressRange::from_pair(start, end),
        }
    }
}

impl FromStr for Target {
    type Err = RangeError;

    /// Parses CIDR notation like "192.168.1.0/24".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((base, prefix_str)) = s.split_once('/') else {
            return Err(RangeError::MissingPrefix(s.to_string()));
        };

        let prefix_len: i64 = prefix_str
            .parse()
            .map_err(|_| RangeError::InvalidPrefix(prefix_str.to_string()))?;

        Ok(Target::Cidr {
            base: base.to_string(),
            prefix_len,
        })
    }
}

/// Parses the positional tokens and builds the range in one go.
pub fn to_range<S: AsRef<str>>(tokens: &[S]) -> Result<AddressRange, RangeError> {
    Target::from_tokens(tokens)?.to_range()
}
