use super::testable::{LoggingTransport, SmtpTransport, UserSettings};
use crate::error::Result;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Flipped by the first [`DatabaseConnection::new`] in the process.
pub static DATABASE_INITIALIZED: AtomicBool = AtomicBool::new(false);

pub fn database_initialized() -> bool {
    DATABASE_INITIALIZED.load(Ordering::SeqCst)
}

/// Opens `app.db` in the working directory, creates its schema and sets a
/// process-wide flag, all from the constructor.
pub struct DatabaseConnection {
    conn: Connection,
}

impl DatabaseConnection {
    pub fn new() -> Result<Self> {
        let conn = Connection::open("app.db")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT UNIQUE,
                email TEXT UNIQUE,
                created_at TIMESTAMP
            )",
            [],
        )?;
        DATABASE_INITIALIZED.store(true, Ordering::SeqCst);
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Dials the SMTP server with baked-in credentials and creates `logs/`
/// while being constructed.
pub struct EmailService {
    smtp: LoggingTransport,
}

impl EmailService {
    pub fn new() -> Result<Self> {
        let mut smtp = LoggingTransport::default();
        smtp.open("smtp.gmail.com", 587)?;
        smtp.starttls()?;
        smtp.login("app@example.com", "password123")?;

        if !Path::new("logs").exists() {
            fs::create_dir_all("logs")?;
        }
        Ok(Self { smtp })
    }

    pub fn send_email(&mut self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = format!("Subject: {subject}\n\n{body}");
        self.smtp.sendmail("app@example.com", to, &message)
    }
}

pub struct UserManager {
    pub db: DatabaseConnection,
    pub email_service: EmailService,
}

impl UserManager {
    pub fn new() -> Result<Self> {
        let db = DatabaseConnection::new()?;
        let email_service = EmailService::new()?;

        if !Path::new("config.json").exists() {
            fs::write(
                "config.json",
                serde_json::to_string(&UserSettings::default())?,
            )?;
        }
        tracing::info!("registering with monitoring service");

        Ok(Self { db, email_service })
    }
}

/// Constructing this builds the whole graph above, then creates `cache/` and
/// announces background work.
pub struct UserService {
    pub user_manager: UserManager,
}

impl UserService {
    pub fn new() -> Result<Self> {
        let user_manager = UserManager::new()?;
        if !Path::new("cache").exists() {
            fs::create_dir_all("cache")?;
        }
        tracing::info!("starting background tasks");
        Ok(Self { user_manager })
    }
}
