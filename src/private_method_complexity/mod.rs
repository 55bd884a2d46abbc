//! Private method complexity
//!
//! [`untestable::UserValidator`] hides every rule in a private helper and
//! reports only a generic message per field. The refactor makes each rule a
//! public [`ValidationRule`] with its own precise violations ([`rules`]) and
//! composes them in an injectable [`UserValidator`] ([`validator`]).

pub mod rules;
pub mod untestable;
pub mod validator;

pub use rules::{
    AddressRule, AgeRule, EmailRule, PasswordRule, RuleViolation, UsernameRule, ValidationRule,
};
pub use validator::{
    DEFAULT_COUNTRIES, DEFAULT_TLDS, US_STATES, UserValidator, create_user_validator,
};
