//! Shared building blocks for `async-rdns`.
//!
//! * [`network`]: IPv4 numbering, address ranges, target parsing and the
//!   per-octet exclusion filter.
//! * [`config`]: the validated run configuration.
//! * [`error`]: the configuration error taxonomy.

pub mod config;
pub mod error;
pub mod network;
