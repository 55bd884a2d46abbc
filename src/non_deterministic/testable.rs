use crate::error::{Error, Result};
use crate::providers::{RandomProvider, SystemClock, ThreadRandom, TimeProvider};
use chrono::{NaiveDateTime, TimeDelta, Timelike};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error as ThisError;
use walkdir::WalkDir;

// ============================================================================
// Order request
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
}

/// Incoming order as submitted by a customer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderRequest {
    pub id: String,
    pub customer_id: String,
    pub customer_email: String,
    pub items: Vec<LineRequest>,
    pub total: Decimal,
    pub shipping_address: Option<ShippingAddress>,
}

// ============================================================================
// External services
// ============================================================================

pub trait InventoryService: Send + Sync {
    fn check_availability(&self, items: &[LineRequest]) -> Result<bool>;
    fn update_quantity(&self, items: &[LineRequest]) -> Result<()>;
}

pub trait CreditService: Send + Sync {
    fn check_credit(&self, customer_id: &str) -> Result<bool>;
    fn update_credit(&self, customer_id: &str, amount: Decimal) -> Result<()>;
}

pub trait ShippingService: Send + Sync {
    fn check_availability(&self, address: Option<&ShippingAddress>) -> Result<bool>;
}

pub trait EmailService: Send + Sync {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

// ============================================================================
// Business hours
// ============================================================================

/// Inclusive window of hours during which orders are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start: u32,
    pub end: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self { start: 9, end: 17 }
    }
}

impl BusinessHours {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.start..=self.end).contains(&hour)
    }
}

fn twelve_hour(hour: u32) -> String {
    match hour % 24 {
        0 => "12 AM".to_string(),
        h @ 1..=11 => format!("{h} AM"),
        12 => "12 PM".to_string(),
        h => format!("{} PM", h - 12),
    }
}

impl fmt::Display for BusinessHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", twelve_hour(self.start), twelve_hour(self.end))
    }
}

/// Why an order was not processed.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum OrderRejection {
    #[error("Orders can only be processed during business hours ({hours})")]
    OutsideBusinessHours { hours: BusinessHours },

    #[error("Insufficient inventory")]
    InsufficientInventory,

    #[error("Insufficient credit")]
    InsufficientCredit,

    #[error("Shipping not available to this address")]
    ShippingUnavailable,

    /// A collaborator failed; carries its message.
    #[error("{0}")]
    Failed(String),
}

impl From<Error> for OrderRejection {
    fn from(error: Error) -> Self {
        tracing::warn!(category = %error.category(), %error, "order collaborator failed");
        OrderRejection::Failed(error.to_string())
    }
}

// ============================================================================
// Order processor
// ============================================================================

pub struct OrderProcessor {
    time: Arc<dyn TimeProvider>,
    random: Arc<dyn RandomProvider>,
    inventory: Arc<dyn InventoryService>,
    credit: Arc<dyn CreditService>,
    shipping: Arc<dyn ShippingService>,
    email: Arc<dyn EmailService>,
    hours: BusinessHours,
    is_processing: AtomicBool,
    last_processed_id: Mutex<Option<String>>,
}

impl OrderProcessor {
    pub fn new(
        time: Arc<dyn TimeProvider>,
        random: Arc<dyn RandomProvider>,
        inventory: Arc<dyn InventoryService>,
        credit: Arc<dyn CreditService>,
        shipping: Arc<dyn ShippingService>,
        email: Arc<dyn EmailService>,
    ) -> Self {
        Self {
            time,
            random,
            inventory,
            credit,
            shipping,
            email,
            hours: BusinessHours::default(),
            is_processing: AtomicBool::new(false),
            last_processed_id: Mutex::new(None),
        }
    }

    pub fn with_business_hours(mut self, hours: BusinessHours) -> Self {
        self.hours = hours;
        self
    }

    pub fn business_hours(&self) -> BusinessHours {
        self.hours
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::SeqCst)
    }

    pub fn last_processed_id(&self) -> Option<String> {
        self.last_processed_id.lock().clone()
    }

    /// Runs the checks, then the side effects, stopping at the first refusal.
    pub fn process_order(&self, order: &OrderRequest) -> std::result::Result<(), OrderRejection> {
        let hour = self.time.now().hour();
        if !self.hours.contains(hour) {
            return Err(OrderRejection::OutsideBusinessHours { hours: self.hours });
        }

        let seconds = self.random.uniform(0.5, 2.0);
        self.time
            .sleep(Duration::try_from_secs_f64(seconds).unwrap_or_default());

        if !self.inventory.check_availability(&order.items)? {
            return Err(OrderRejection::InsufficientInventory);
        }
        if !self.credit.check_credit(&order.customer_id)? {
            return Err(OrderRejection::InsufficientCredit);
        }
        if !self
            .shipping
            .check_availability(order.shipping_address.as_ref())?
        {
            return Err(OrderRejection::ShippingUnavailable);
        }

        self.inventory.update_quantity(&order.items)?;
        self.credit.update_credit(&order.customer_id, order.total)?;
        self.email.send_email(
            &order.customer_email,
            "Order Confirmation",
            &format!("Your order {} has been processed successfully.", order.id),
        )?;

        tracing::info!(order.id = %order.id, "order processed");
        Ok(())
    }

    /// Processes `orders` in sequence, skipping an order whose id repeats the
    /// one processed immediately before it.
    pub fn process_orders(
        &self,
        orders: &[OrderRequest],
    ) -> Vec<std::result::Result<(), OrderRejection>> {
        self.is_processing.store(true, Ordering::SeqCst);
        let mut results = Vec::with_capacity(orders.len());
        for order in orders {
            if self.last_processed_id.lock().as_deref() == Some(order.id.as_str()) {
                tracing::debug!(order.id = %order.id, "skipping repeated order");
                continue;
            }
            results.push(self.process_order(order));
            *self.last_processed_id.lock() = Some(order.id.clone());
        }
        self.is_processing.store(false, Ordering::SeqCst);
        results
    }
}

// ============================================================================
// Cache with clock-driven expiry
// ============================================================================

pub struct CacheManager<V> {
    time: Arc<dyn TimeProvider>,
    max_age: TimeDelta,
    entries: HashMap<String, (V, NaiveDateTime)>,
}

impl<V: Clone> CacheManager<V> {
    pub fn new(time: Arc<dyn TimeProvider>) -> Self {
        Self::with_max_age(time, TimeDelta::hours(1))
    }

    pub fn with_max_age(time: Arc<dyn TimeProvider>, max_age: TimeDelta) -> Self {
        Self {
            time,
            max_age,
            entries: HashMap::new(),
        }
    }

    /// Returns a fresh entry. An expired entry is evicted and reported missing.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let (value, stored_at) = self.entries.get(key)?;
        if self.time.now() - *stored_at < self.max_age {
            return Some(value.clone());
        }
        self.entries.remove(key);
        None
    }

    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), (value, self.time.now()));
    }

    pub fn cleanup(&mut self) {
        let now = self.time.now();
        let max_age = self.max_age;
        self.entries
            .retain(|_, (_, stored_at)| now - *stored_at < max_age);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// File processing
// ============================================================================

pub trait FileSystem: Send + Sync {
    /// Names of the regular files directly inside `directory`.
    fn list_files(&self, directory: &Path) -> Result<Vec<String>>;
    fn process_file(&self, path: &Path) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn list_files(&self, directory: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| Error::collaborator(e.to_string()))?;
            if entry.file_type().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn process_file(&self, path: &Path) -> Result<()> {
        let metadata = std::fs::metadata(path)?;
        tracing::info!(path = %path.display(), bytes = metadata.len(), "processed file");
        Ok(())
    }
}

/// Picks up files it has not seen before in one directory.
pub struct FileProcessor {
    fs: Arc<dyn FileSystem>,
    time: Arc<dyn TimeProvider>,
    directory: PathBuf,
    processed: HashSet<String>,
    last_run: Option<NaiveDateTime>,
}

impl FileProcessor {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        time: Arc<dyn TimeProvider>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fs,
            time,
            directory: directory.into(),
            processed: HashSet::new(),
            last_run: None,
        }
    }

    pub fn processed_files(&self) -> &HashSet<String> {
        &self.processed
    }

    pub fn mark_processed(&mut self, name: impl Into<String>) {
        self.processed.insert(name.into());
    }

    pub fn last_run(&self) -> Option<NaiveDateTime> {
        self.last_run
    }

    /// Returns the names processed by this run. Failures are logged and
    /// reported as an empty run; files handled before the failure stay
    /// recorded.
    pub fn process_new_files(&mut self) -> Vec<String> {
        self.last_run = Some(self.time.now());
        match self.try_process_new_files() {
            Ok(names) => names,
            Err(error) => {
                tracing::warn!(
                    directory = %self.directory.display(),
                    %error,
                    "Error processing files"
                );
                Vec::new()
            }
        }
    }

    fn try_process_new_files(&mut self) -> Result<Vec<String>> {
        let new_files: Vec<String> = self
            .fs
            .list_files(&self.directory)?
            .into_iter()
            .filter(|name| !self.processed.contains(name))
            .collect();

        for name in &new_files {
            self.fs.process_file(&self.directory.join(name))?;
            self.processed.insert(name.clone());
        }
        Ok(new_files)
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Stand-in that reports every item as in stock.
#[derive(Debug, Default)]
pub struct AlwaysAvailableInventory;

impl InventoryService for AlwaysAvailableInventory {
    fn check_availability(&self, _items: &[LineRequest]) -> Result<bool> {
        Ok(true)
    }

    fn update_quantity(&self, items: &[LineRequest]) -> Result<()> {
        tracing::debug!(lines = items.len(), "inventory updated");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct OpenCreditLine;

impl CreditService for OpenCreditLine {
    fn check_credit(&self, _customer_id: &str) -> Result<bool> {
        Ok(true)
    }

    fn update_credit(&self, customer_id: &str, amount: Decimal) -> Result<()> {
        tracing::debug!(customer_id, %amount, "credit charged");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DomesticShipping;

impl ShippingService for DomesticShipping {
    fn check_availability(&self, _address: Option<&ShippingAddress>) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct LoggingEmailService;

impl EmailService for LoggingEmailService {
    fn send_email(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        tracing::info!(to, subject, "email sent");
        Ok(())
    }
}

/// Processor on the system clock and thread RNG with stand-in services.
pub fn create_order_processor(hours: BusinessHours) -> OrderProcessor {
    OrderProcessor::new(
        Arc::new(SystemClock),
        Arc::new(ThreadRandom),
        Arc::new(AlwaysAvailableInventory),
        Arc::new(OpenCreditLine),
        Arc::new(DomesticShipping),
        Arc::new(LoggingEmailService),
    )
    .with_business_hours(hours)
}
