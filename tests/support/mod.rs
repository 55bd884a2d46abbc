#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use tempfile::{TempDir, tempdir};
use testability_patterns::error::{Error, Result};
use testability_patterns::hidden_side_effects::EventLog;
use testability_patterns::tight_coupling::{
    NewOrder, NotificationService, OrderExporter, OrderRecord, OrderRepository,
};
use testability_patterns::{AppConfig, FixedClock, TimeProvider};

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("valid date")
        .and_hms_opt(hour, minute, 0)
        .expect("valid time")
}

pub fn fixed_clock(now: NaiveDateTime) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(now))
}

/// Temporary directory every filesystem-touching test writes into.
pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn config(&self) -> AppConfig {
        AppConfig {
            workspace_root: self.root.clone(),
            ..AppConfig::default()
        }
    }
}

// =============================================================================
// Event log
// =============================================================================

#[derive(Default)]
pub struct RecordingEventLog {
    pub infos: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
}

impl EventLog for RecordingEventLog {
    fn info(&self, message: &str) {
        self.infos.lock().push(message.to_string());
    }

    fn warning(&self, message: &str) {
        self.warnings.lock().push(message.to_string());
    }
}

// =============================================================================
// Order collaborators
// =============================================================================

/// Keeps orders in a vector and stamps them with the injected clock.
pub struct InMemoryOrderRepository {
    clock: Arc<dyn TimeProvider>,
    pub orders: Mutex<Vec<OrderRecord>>,
    pub fail_saves: bool,
    pub lose_orders: bool,
}

impl InMemoryOrderRepository {
    pub fn new(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            clock,
            orders: Mutex::new(Vec::new()),
            fail_saves: false,
            lose_orders: false,
        }
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn save_order(&self, order: &NewOrder) -> Result<i64> {
        if self.fail_saves {
            return Err(Error::collaborator("Database error"));
        }
        let mut orders = self.orders.lock();
        let id = orders.len() as i64 + 1;
        orders.push(OrderRecord {
            id,
            customer_id: order.customer_id,
            total_amount: order.total_amount,
            status: order.status.clone(),
            created_at: self.clock.now(),
        });
        Ok(id)
    }

    fn get_order(&self, order_id: i64) -> Result<Option<OrderRecord>> {
        if self.lose_orders {
            return Ok(None);
        }
        Ok(self
            .orders
            .lock()
            .iter()
            .find(|order| order.id == order_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, i64)>>,
    pub fail: bool,
}

impl NotificationService for RecordingNotifier {
    fn send_order_confirmation(&self, customer_email: &str, order_id: i64) -> Result<()> {
        if self.fail {
            return Err(Error::collaborator("Email error"));
        }
        self.sent.lock().push((customer_email.to_string(), order_id));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingExporter {
    pub batches: Mutex<Vec<Vec<OrderRecord>>>,
}

impl OrderExporter for RecordingExporter {
    fn export_orders(&self, orders: &[OrderRecord]) -> Result<()> {
        self.batches.lock().push(orders.to_vec());
        Ok(())
    }
}

pub fn new_order(customer_id: i64, total_amount: f64) -> NewOrder {
    NewOrder {
        customer_id,
        customer_email: "test@example.com".to_string(),
        total_amount,
        status: "pending".to_string(),
    }
}
