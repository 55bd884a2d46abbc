//! Hidden side effects
//!
//! The [`untestable`] manager creates directories in its constructor, rewrites
//! a metadata file on every mutation and logs through the global subscriber.
//! The [`testable`] manager receives its [`Storage`], [`EventLog`] and clock,
//! so every effect it has is visible at the call site.

pub mod testable;
pub mod untestable;

pub use testable::{
    EventLog, FileStorage, MemoryStorage, Storage, TracingEventLog, UserData, UserManager,
    UserValidator,
};
