use super::testable::{LineRequest, OrderRequest};
use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

fn pause(min: f64, max: f64) {
    let seconds = rand::thread_rng().gen_range(min..max);
    thread::sleep(Duration::from_secs_f64(seconds));
}

fn roll_above(threshold: f64) -> bool {
    rand::thread_rng().r#gen::<f64>() > threshold
}

/// Reads the wall clock, sleeps for random intervals and decides stock,
/// credit and shipping by chance.
#[derive(Debug, Default)]
pub struct OrderProcessor {
    pub is_processing: bool,
    last_processed_id: Option<String>,
}

impl OrderProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_order(&mut self, order: &OrderRequest) -> (bool, Option<String>) {
        let hour = Local::now().hour();
        if !(9..=17).contains(&hour) {
            return (
                false,
                Some("Orders can only be processed during business hours (9 AM - 5 PM)".into()),
            );
        }

        pause(0.5, 2.0);

        if !self.check_inventory(&order.items) {
            return (false, Some("Insufficient inventory".into()));
        }
        if !self.check_customer_credit(&order.customer_id) {
            return (false, Some("Insufficient credit".into()));
        }
        if !self.check_shipping_availability() {
            return (false, Some("Shipping not available to this address".into()));
        }

        pause(0.2, 1.0);
        pause(0.2, 1.0);
        pause(0.5, 2.0);
        (true, None)
    }

    pub fn process_orders(&mut self, orders: &[OrderRequest]) -> Vec<(bool, Option<String>)> {
        self.is_processing = true;
        let mut results = Vec::new();
        for order in orders {
            if self.last_processed_id.as_deref() == Some(order.id.as_str()) {
                continue;
            }
            results.push(self.process_order(order));
            self.last_processed_id = Some(order.id.clone());
        }
        self.is_processing = false;
        results
    }

    fn check_inventory(&self, _items: &[LineRequest]) -> bool {
        pause(0.1, 0.5);
        roll_above(0.1)
    }

    fn check_customer_credit(&self, _customer_id: &str) -> bool {
        pause(0.1, 0.5);
        roll_above(0.2)
    }

    fn check_shipping_availability(&self) -> bool {
        pause(0.1, 0.5);
        roll_above(0.05)
    }
}

/// Expires entries against `Local::now()`.
#[derive(Debug)]
pub struct CacheManager<V> {
    entries: HashMap<String, (V, NaiveDateTime)>,
    max_age: TimeDelta,
}

impl<V: Clone> Default for CacheManager<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            max_age: TimeDelta::hours(1),
        }
    }
}

impl<V: Clone> CacheManager<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        let (value, stored_at) = self.entries.get(key)?;
        if Local::now().naive_local() - *stored_at < self.max_age {
            return Some(value.clone());
        }
        self.entries.remove(key);
        None
    }

    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.entries
            .insert(key.into(), (value, Local::now().naive_local()));
    }

    pub fn cleanup(&mut self) {
        let now = Local::now().naive_local();
        let max_age = self.max_age;
        self.entries.retain(|_, (_, stored_at)| now - *stored_at < max_age);
    }
}

/// Lists its directory with `read_dir` and sleeps a random time per file.
#[derive(Debug)]
pub struct FileProcessor {
    directory: PathBuf,
    processed_files: HashSet<String>,
}

impl FileProcessor {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            processed_files: HashSet::new(),
        }
    }

    pub fn process_new_files(&mut self) -> Vec<String> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(%error, "Error processing files");
                return Vec::new();
            }
        };

        let new_files: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !self.processed_files.contains(name))
            .collect();

        for name in &new_files {
            pause(0.1, 1.0);
            self.processed_files.insert(name.clone());
        }
        new_files
    }
}
