//! Conversions between dotted-decimal text and host-order integers.

use std::net::Ipv4Addr;

use crate::error::RangeError;

/// Parses a dotted-decimal IPv4 literal into its host-order integer.
///
/// Only the canonical four-octet form is accepted: no shorthand, no
/// leading zeros.
pub fn numberize(addr: &str) -> Result<u32, RangeError> {
    addr.parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| RangeError::InvalidAddress(addr.to_string()))
}

/// Formats a host-order integer as dotted decimal.
pub fn denumberize(addr: u32) -> String {
    Ipv4Addr::from(addr).to_string()
}

/// Name queried for the PTR record of `addr`, e.g. `4.3.2.1.in-addr.arpa`.
pub fn reverse_pointer(addr: Ipv4Addr) -> String {
    let [a, b, c, d] = addr.octets();
    format!("{d}.{c}.{b}.{a}.in-addr.arpa")
}
