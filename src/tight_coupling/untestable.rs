use super::testable::{NewOrder, OrderRecord};
use crate::error::{Error, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::PathBuf;

/// Bound to `orders.db` in the working directory.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new() -> Result<Self> {
        let conn = Connection::open("orders.db")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY,
                customer_id INTEGER,
                total_amount REAL,
                status TEXT,
                created_at TIMESTAMP
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    pub fn save_order(&self, order: &NewOrder) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO orders (customer_id, total_amount, status, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                order.customer_id,
                order.total_amount,
                order.status,
                Local::now().naive_local()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_order(&self, order_id: i64) -> Result<Option<OrderRecord>> {
        Ok(self
            .conn
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
            .optional()?)
    }
}

/// Hard-coded sender and credentials.
#[derive(Debug)]
pub struct EmailSender {
    smtp_server: &'static str,
    sender_email: &'static str,
}

impl Default for EmailSender {
    fn default() -> Self {
        Self {
            smtp_server: "smtp.gmail.com",
            sender_email: "orders@example.com",
        }
    }
}

impl EmailSender {
    pub fn send_order_confirmation(&self, customer_email: &str, order_id: i64) {
        tracing::info!(
            smtp.server = self.smtp_server,
            smtp.from = self.sender_email,
            "Sending order confirmation to {customer_email} for order {order_id}"
        );
    }
}

pub struct OrderProcessor {
    db: Database,
    email_sender: EmailSender,
}

impl OrderProcessor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            db: Database::new()?,
            email_sender: EmailSender::default(),
        })
    }

    pub fn process_order(&self, order: &NewOrder) -> Result<OrderRecord> {
        let order_id = self.db.save_order(order)?;
        self.email_sender
            .send_order_confirmation(&order.customer_email, order_id);
        self.db
            .get_order(order_id)?
            .ok_or_else(|| Error::collaborator(format!("Order {order_id} not found after save")))
    }
}

/// Creates `exports/` as soon as it is built and stamps files with
/// `Local::now()`.
pub struct OrderExporter {
    export_dir: PathBuf,
}

impl OrderExporter {
    pub fn new() -> Result<Self> {
        let export_dir = PathBuf::from("exports");
        fs::create_dir_all(&export_dir)?;
        Ok(Self { export_dir })
    }

    pub fn export_orders(&self, orders: &[OrderRecord]) -> Result<()> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.export_dir.join(format!("orders_{timestamp}.json"));
        fs::write(path, serde_json::to_string_pretty(orders)?)?;
        Ok(())
    }
}

pub struct OrderManager {
    processor: OrderProcessor,
    exporter: OrderExporter,
}

impl OrderManager {
    pub fn new() -> Result<Self> {
        Ok(Self {
            processor: OrderProcessor::new()?,
            exporter: OrderExporter::new()?,
        })
    }

    pub fn handle_new_order(&self, order: &NewOrder) -> Result<OrderRecord> {
        let processed = self.processor.process_order(order)?;
        self.exporter
            .export_orders(std::slice::from_ref(&processed))?;
        Ok(processed)
    }
}
