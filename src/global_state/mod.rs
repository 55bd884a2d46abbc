//! Global state
//!
//! [`untestable`] keeps its user cache and hit counters in a process-wide
//! `static`, so every test observes what the previous one left behind.
//! [`testable`] gives each service an owned [`Cache`] that callers inject
//! and share explicitly.

pub mod testable;
pub mod untestable;

pub use testable::{Cache, CacheStats, User, UserService, UserStats};
