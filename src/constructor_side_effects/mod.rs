//! Constructor side effects
//!
//! The [`untestable`] types open databases, dial SMTP servers and create
//! directories as soon as they are constructed. The [`testable`] types only
//! store their parameters; every side effect lives behind an explicit
//! `connect()` / `initialize()` / `cleanup()` step and every collaborator is
//! passed in.

pub mod testable;
pub mod untestable;

pub use testable::{
    ConfigManager, ConfigSource, Database, DatabaseConnection, EmailService, Lifecycle,
    LoggingTransport, ServiceSettings, SmtpEmailService, SmtpSettings, SmtpTransport,
    UserManager, UserService, UserSettings, create_user_service,
};
