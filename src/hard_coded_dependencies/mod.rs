//! Hard-coded dependencies
//!
//! [`untestable::UserService`] builds its HTTP client inside `new()`, so every
//! call goes to the real API. [`testable::UserService`] receives an
//! [`testable::HttpSession`] instead and falls back to the `reqwest` session
//! only when the caller does not supply one.

pub mod testable;
pub mod untestable;

pub use testable::{DEFAULT_BASE_URL, HttpResponse, HttpSession, ReqwestSession, UserService};
