use thiserror::Error;

/// Failures while turning command-line tokens into an address range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("bad IP address: {0}")]
    InvalidAddress(String),

    #[error("CIDR prefix lengths are between 0 and 32, got {0}")]
    InvalidPrefix(String),

    #[error("CIDR base address {base} does not start at a /{prefix} subnet boundary")]
    MisalignedSubnet { base: String, prefix: u8 },

    #[error("start address {start} must not be greater than end address {end}")]
    RangeOrderError { start: String, end: String },

    #[error("increment must be a positive integer, got {0}")]
    NonPositiveIncrement(i64),

    #[error("expected a CIDR block such as 10.0.0.0/24, got {0}")]
    MissingPrefix(String),

    #[error("expected either a CIDR block or a start and end address, got {0} arguments")]
    TargetCount(usize),
}

/// Failures while parsing a per-octet exclusion spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExclusionError {
    #[error("exclusion spec has {0} fields, at most 4 are allowed")]
    TooManyFields(usize),

    #[error("exclusion value {value} for octet {position} is not between 0 and 255")]
    OctetOutOfRange { position: usize, value: String },
}

/// Anything that makes the run configuration unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Exclusion(#[from] ExclusionError),

    #[error("max in-flight queries must be a positive integer, got {0}")]
    NonPositiveMaxInFlight(i64),
}
