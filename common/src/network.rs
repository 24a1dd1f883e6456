pub mod address;
pub mod exclusion;
pub mod range;
pub mod target;
