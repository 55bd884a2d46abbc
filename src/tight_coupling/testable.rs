use crate::config::SmtpSettings;
use crate::error::{Error, Result};
use crate::providers::{SystemClock, TimeProvider};
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An order as submitted, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: i64,
    pub customer_email: String,
    pub total_amount: f64,
    pub status: String,
}

/// A persisted order row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub customer_id: i64,
    pub total_amount: f64,
    pub status: String,
    pub created_at: NaiveDateTime,
}

// ============================================================================
// Seams
// ============================================================================

pub trait OrderRepository: Send + Sync {
    /// Stores the order and returns its new id.
    fn save_order(&self, order: &NewOrder) -> Result<i64>;
    fn get_order(&self, order_id: i64) -> Result<Option<OrderRecord>>;
}

pub trait NotificationService: Send + Sync {
    fn send_order_confirmation(&self, customer_email: &str, order_id: i64) -> Result<()>;
}

pub trait OrderExporter: Send + Sync {
    fn export_orders(&self, orders: &[OrderRecord]) -> Result<()>;
}

pub trait OrderProcessing: Send + Sync {
    fn process_order(&self, order: &NewOrder) -> Result<OrderRecord>;
}

// ============================================================================
// SQLite repository
// ============================================================================

const CREATE_ORDERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY,
    customer_id INTEGER,
    total_amount REAL,
    status TEXT,
    created_at TIMESTAMP
)";

pub struct SqliteOrderRepository {
    conn: Mutex<Connection>,
    clock: Arc<dyn TimeProvider>,
}

impl SqliteOrderRepository {
    pub fn open(db_path: impl AsRef<Path>, clock: Arc<dyn TimeProvider>) -> Result<Self> {
        Self::from_connection(Connection::open(db_path)?, clock)
    }

    pub fn in_memory(clock: Arc<dyn TimeProvider>) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, clock)
    }

    fn from_connection(conn: Connection, clock: Arc<dyn TimeProvider>) -> Result<Self> {
        conn.execute(CREATE_ORDERS_TABLE, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }
}

impl OrderRepository for SqliteOrderRepository {
    fn save_order(&self, order: &NewOrder) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO orders (customer_id, total_amount, status, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                order.customer_id,
                order.total_amount,
                order.status,
                self.clock.now()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_order(&self, order_id: i64) -> Result<Option<OrderRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT id, customer_id, total_amount, status, created_at
                 FROM orders WHERE id = ?1",
                params![order_id],
                |row| {
                    Ok(OrderRecord {
                        id: row.get(0)?,
                        customer_id: row.get(1)?,
                        total_amount: row.get(2)?,
                        status: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}

// ============================================================================
// Notification and export
// ============================================================================

/// Confirmation sender. Logs instead of speaking SMTP.
#[derive(Debug, Clone)]
pub struct EmailNotificationService {
    smtp: SmtpSettings,
}

impl EmailNotificationService {
    pub fn new(smtp: SmtpSettings) -> Self {
        Self { smtp }
    }

    pub fn smtp(&self) -> &SmtpSettings {
        &self.smtp
    }
}

impl NotificationService for EmailNotificationService {
    fn send_order_confirmation(&self, customer_email: &str, order_id: i64) -> Result<()> {
        tracing::info!(
            smtp.server = %self.smtp.server,
            smtp.from = %self.smtp.username,
            order_id,
            "Sending order confirmation to {customer_email} for order {order_id}"
        );
        Ok(())
    }
}

/// Writes pretty-printed JSON batches named after the export time.
///
/// File names have one-second resolution: a second export within the same
/// clock second replaces the first file.
pub struct JsonOrderExporter {
    export_dir: PathBuf,
    clock: Arc<dyn TimeProvider>,
}

impl JsonOrderExporter {
    pub fn new(export_dir: impl Into<PathBuf>, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            export_dir: export_dir.into(),
            clock,
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn file_name_for(at: NaiveDateTime) -> String {
        format!("orders_{}.json", at.format("%Y%m%d_%H%M%S"))
    }
}

impl OrderExporter for JsonOrderExporter {
    fn export_orders(&self, orders: &[OrderRecord]) -> Result<()> {
        fs::create_dir_all(&self.export_dir)?;
        let path = self
            .export_dir
            .join(Self::file_name_for(self.clock.now()));
        fs::write(&path, serde_json::to_string_pretty(orders)?)?;
        tracing::info!(path = %path.display(), count = orders.len(), "orders exported");
        Ok(())
    }
}

// ============================================================================
// Business logic
// ============================================================================

pub struct OrderProcessor {
    repository: Arc<dyn OrderRepository>,
    notifications: Arc<dyn NotificationService>,
}

impl OrderProcessor {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        notifications: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    pub fn repository(&self) -> &Arc<dyn OrderRepository> {
        &self.repository
    }

    pub fn notifications(&self) -> &Arc<dyn NotificationService> {
        &self.notifications
    }
}

impl OrderProcessing for OrderProcessor {
    /// Save, confirm, then reload the stored row.
    fn process_order(&self, order: &NewOrder) -> Result<OrderRecord> {
        let order_id = self.repository.save_order(order)?;
        self.notifications
            .send_order_confirmation(&order.customer_email, order_id)?;
        self.repository
            .get_order(order_id)?
            .ok_or_else(|| Error::collaborator(format!("Order {order_id} not found after save")))
    }
}

pub struct OrderManager {
    processor: Arc<dyn OrderProcessing>,
    exporter: Arc<dyn OrderExporter>,
}

impl OrderManager {
    pub fn new(processor: Arc<dyn OrderProcessing>, exporter: Arc<dyn OrderExporter>) -> Self {
        Self {
            processor,
            exporter,
        }
    }

    pub fn handle_new_order(&self, order: &NewOrder) -> Result<OrderRecord> {
        let processed = self.processor.process_order(order)?;
        self.exporter
            .export_orders(std::slice::from_ref(&processed))?;
        Ok(processed)
    }
}

// ============================================================================
// Factories
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSettings {
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub smtp: SmtpSettings,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("orders.db"),
            export_dir: PathBuf::from("exports"),
            smtp: SmtpSettings {
                username: "orders@example.com".to_string(),
                ..SmtpSettings::default()
            },
        }
    }
}

pub fn create_order_repository(db_path: impl AsRef<Path>) -> Result<Arc<dyn OrderRepository>> {
    Ok(Arc::new(SqliteOrderRepository::open(
        db_path,
        Arc::new(SystemClock),
    )?))
}

pub fn create_notification_service(smtp: &SmtpSettings) -> Arc<dyn NotificationService> {
    Arc::new(EmailNotificationService::new(smtp.clone()))
}

pub fn create_order_exporter(export_dir: impl Into<PathBuf>) -> Arc<dyn OrderExporter> {
    Arc::new(JsonOrderExporter::new(export_dir, Arc::new(SystemClock)))
}

pub fn create_order_manager(settings: &OrderSettings) -> Result<OrderManager> {
    let repository = create_order_repository(&settings.db_path)?;
    let notifications = create_notification_service(&settings.smtp);
    let processor = Arc::new(OrderProcessor::new(repository, notifications));
    let exporter = create_order_exporter(&settings.export_dir);
    Ok(OrderManager::new(processor, exporter))
}
