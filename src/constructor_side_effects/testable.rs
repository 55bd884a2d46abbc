pub use crate::config::SmtpSettings;

use crate::error::{Error, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Database
// ============================================================================

/// Explicit connection lifecycle for the user database.
pub trait Database {
    fn connect(&mut self) -> Result<()>;
    fn create_tables(&mut self) -> Result<()>;
    fn close(&mut self);
}

/// SQLite handle that does nothing until [`Database::connect`] is called.
#[derive(Debug)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    conn: Option<Connection>,
}

impl DatabaseConnection {
    /// `":memory:"` opens a private in-memory database.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            conn: None,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| Error::not_connected("database"))
    }

    /// Names of the tables currently defined, sorted.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

impl Database for DatabaseConnection {
    fn connect(&mut self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;
        tracing::debug!(path = %self.db_path.display(), "database connected");
        self.conn = Some(conn);
        Ok(())
    }

    fn create_tables(&mut self) -> Result<()> {
        self.connection()?.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT UNIQUE,
                email TEXT UNIQUE,
                created_at TIMESTAMP
            )",
            [],
        )?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, error)) = conn.close() {
                tracing::warn!(%error, "database close failed");
            }
        }
    }
}

// ============================================================================
// Email
// ============================================================================

/// Outgoing mail. Services that hold a connection override the lifecycle
/// hooks; the defaults do nothing.
pub trait EmailService {
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn send_email(&mut self, to: &str, subject: &str, body: &str) -> Result<()>;

    fn close(&mut self) {}
}

/// The SMTP conversation, one method per protocol step.
pub trait SmtpTransport {
    fn open(&mut self, server: &str, port: u16) -> Result<()>;
    fn starttls(&mut self) -> Result<()>;
    fn login(&mut self, username: &str, password: &str) -> Result<()>;
    fn sendmail(&mut self, from: &str, to: &str, message: &str) -> Result<()>;
    fn quit(&mut self) -> Result<()>;
}

/// Transport stand-in that reports each step through `tracing` instead of
/// opening a socket.
#[derive(Debug, Default)]
pub struct LoggingTransport {
    endpoint: Option<String>,
}

impl SmtpTransport for LoggingTransport {
    fn open(&mut self, server: &str, port: u16) -> Result<()> {
        let endpoint = format!("{server}:{port}");
        tracing::info!(smtp.endpoint = %endpoint, "smtp session opened");
        self.endpoint = Some(endpoint);
        Ok(())
    }

    fn starttls(&mut self) -> Result<()> {
        tracing::debug!(smtp.endpoint = ?self.endpoint, "smtp starttls");
        Ok(())
    }

    fn login(&mut self, username: &str, _password: &str) -> Result<()> {
        tracing::debug!(smtp.user = %username, "smtp login");
        Ok(())
    }

    fn sendmail(&mut self, from: &str, to: &str, message: &str) -> Result<()> {
        tracing::info!(
            smtp.from = %from,
            smtp.to = %to,
            bytes = message.len(),
            "smtp message sent"
        );
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        tracing::info!(smtp.endpoint = ?self.endpoint.take(), "smtp session closed");
        Ok(())
    }
}

/// SMTP-backed email service. Construction only stores settings; the
/// connection is made by [`EmailService::connect`].
#[derive(Debug)]
pub struct SmtpEmailService<T: SmtpTransport = LoggingTransport> {
    settings: SmtpSettings,
    transport: T,
    connected: bool,
}

impl SmtpEmailService<LoggingTransport> {
    pub fn new(settings: SmtpSettings) -> Self {
        Self::with_transport(settings, LoggingTransport::default())
    }
}

impl<T: SmtpTransport> SmtpEmailService<T> {
    pub fn with_transport(settings: SmtpSettings, transport: T) -> Self {
        Self {
            settings,
            transport,
            connected: false,
        }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl<T: SmtpTransport> EmailService for SmtpEmailService<T> {
    fn connect(&mut self) -> Result<()> {
        self.transport
            .open(&self.settings.server, self.settings.port)?;
        self.transport.starttls()?;
        self.transport
            .login(&self.settings.username, &self.settings.password)?;
        self.connected = true;
        Ok(())
    }

    fn send_email(&mut self, to: &str, subject: &str, body: &str) -> Result<()> {
        if !self.connected {
            return Err(Error::not_connected("smtp"));
        }
        let message = format!("Subject: {subject}\n\n{body}");
        self.transport
            .sendmail(&self.settings.username, to, &message)
    }

    fn close(&mut self) {
        if !self.connected {
            return;
        }
        if let Err(error) = self.transport.quit() {
            tracing::warn!(%error, "smtp quit failed");
        }
        self.connected = false;
    }
}

// ============================================================================
// Configuration file
// ============================================================================

/// Settings persisted by [`ConfigManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub max_users: u32,
    pub email_notifications: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            max_users: 1000,
            email_notifications: true,
        }
    }
}

pub trait ConfigSource {
    fn load_config(&mut self) -> Result<UserSettings>;
}

/// JSON settings file that is read or created only by [`ConfigSource::load_config`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    config: Option<UserSettings>,
}

impl ConfigManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            config: None,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config(&self) -> Option<&UserSettings> {
        self.config.as_ref()
    }

    pub fn set_config(&mut self, config: UserSettings) {
        self.config = Some(config);
    }

    /// Writes the current settings, or the defaults if none were loaded.
    pub fn save_config(&self) -> Result<()> {
        let config = self.config.clone().unwrap_or_default();
        fs::write(&self.config_path, serde_json::to_string(&config)?)?;
        Ok(())
    }
}

impl ConfigSource for ConfigManager {
    fn load_config(&mut self) -> Result<UserSettings> {
        let config = if self.config_path.exists() {
            let contents = fs::read_to_string(&self.config_path)?;
            serde_json::from_str(&contents)?
        } else {
            tracing::info!(path = %self.config_path.display(), "writing default settings");
            let defaults = UserSettings::default();
            self.config = Some(defaults.clone());
            self.save_config()?;
            defaults
        };
        self.config = Some(config.clone());
        Ok(config)
    }
}

// ============================================================================
// Managers
// ============================================================================

/// Explicit two-phase lifecycle.
pub trait Lifecycle {
    fn initialize(&mut self) -> Result<()>;
    fn cleanup(&mut self);
}

/// Owns the injected database, mail and config collaborators.
pub struct UserManager<D, E, C> {
    db: D,
    email_service: E,
    config_manager: C,
    settings: Option<UserSettings>,
}

impl<D, E, C> UserManager<D, E, C>
where
    D: Database,
    E: EmailService,
    C: ConfigSource,
{
    pub fn new(db: D, email_service: E, config_manager: C) -> Self {
        Self {
            db,
            email_service,
            config_manager,
            settings: None,
        }
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn email_service(&self) -> &E {
        &self.email_service
    }

    pub fn config_manager(&self) -> &C {
        &self.config_manager
    }

    /// Settings read during the last `initialize()`.
    pub fn settings(&self) -> Option<&UserSettings> {
        self.settings.as_ref()
    }
}

impl<D, E, C> Lifecycle for UserManager<D, E, C>
where
    D: Database,
    E: EmailService,
    C: ConfigSource,
{
    fn initialize(&mut self) -> Result<()> {
        self.db.connect()?;
        self.db.create_tables()?;
        self.settings = Some(self.config_manager.load_config()?);
        self.email_service.connect()?;
        Ok(())
    }

    fn cleanup(&mut self) {
        self.db.close();
        self.email_service.close();
    }
}

pub struct UserService<M> {
    user_manager: M,
    cache_dir: PathBuf,
}

impl<M: Lifecycle> UserService<M> {
    pub fn new(user_manager: M, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_manager,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn user_manager(&self) -> &M {
        &self.user_manager
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn initialize(&mut self) -> Result<()> {
        self.user_manager.initialize()?;
        fs::create_dir_all(&self.cache_dir)?;
        tracing::info!(cache_dir = %self.cache_dir.display(), "user service initialized");
        Ok(())
    }

    pub fn cleanup(&mut self) {
        self.user_manager.cleanup();
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Paths and credentials consumed by [`create_user_service`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub db_path: PathBuf,
    pub smtp: SmtpSettings,
    pub config_path: PathBuf,
    pub cache_dir: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("app.db"),
            smtp: SmtpSettings::default(),
            config_path: PathBuf::from("config.json"),
            cache_dir: PathBuf::from("cache"),
        }
    }
}

pub type DefaultUserService =
    UserService<UserManager<DatabaseConnection, SmtpEmailService, ConfigManager>>;

/// Wires the concrete collaborators. Nothing is opened until `initialize()`.
pub fn create_user_service(settings: &ServiceSettings) -> DefaultUserService {
    let db = DatabaseConnection::new(&settings.db_path);
    let email_service = SmtpEmailService::new(settings.smtp.clone());
    let config_manager = ConfigManager::new(&settings.config_path);
    let user_manager = UserManager::new(db, email_service, config_manager);
    UserService::new(user_manager, &settings.cache_dir)
}
