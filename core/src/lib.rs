//! The bounded-concurrency reverse-DNS engine.
//!
//! * [`resolver`]: the [`resolver::Resolver`] abstraction and its UDP
//!   implementation.
//! * [`scheduler`]: admission control and the event loop.
//! * [`report`]: result formatting.

pub mod report;
pub mod resolver;
pub mod scheduler;
