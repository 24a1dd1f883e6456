use crate::error::{ConfigError, RangeError};
use crate::network::exclusion::ExclusionTable;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 10;

/// Validated settings for one resolution run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Step between consecutive addresses, at least 1.
    pub increment: u32,
    /// Upper bound on outstanding queries, at least 1.
    pub max_in_flight: usize,
    /// Octet values that must not be queried.
    pub exclusions: Option<ExclusionTable>,
    /// Ask nameservers to recurse on our behalf.
    ///
    /// Cleared by `-r` so that only the answers a server already holds are
    /// returned.
    pub recurse: bool,
}

impl Config {
    /// Validates raw command-line values.
    pub fn build(
        increment: i64,
        max_in_flight: i64,
        exclude: Option<&str>,
        no_recursion: bool,
    ) -> Result<Self, ConfigError> {
        let increment: u32 = u32::try_from(increment)
            .ok()
            .filter(|step| *step >= 1)
            .ok_or(RangeError::NonPositiveIncrement(increment))?;

        let max_in_flight: usize = usize::try_from(max_in_flight)
            .ok()
            .filter(|limit| *limit >= 1)
            .ok_or(ConfigError::NonPositiveMaxInFlight(max_in_flight))?;

        let exclusions = exclude
            .map(str::parse::<ExclusionTable>)
            .transpose()?
            .filter(|table| !table.is_empty());

        Ok(Self {
            increment,
            max_in_flight,
            exclusions,
            recurse: !no_recursion,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            increment: 1,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            exclusions: None,
            recurse: true,
        }
    }
}
