use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, TimeDelta};
use serde_json::Value;
use std::collections::HashMap;

/// Prices a raw JSON order in a single pass with every rule inlined and the
/// holiday season read from the wall clock.
#[derive(Debug)]
pub struct OrderProcessor {
    discount_rules: HashMap<&'static str, f64>,
    tax_rates: HashMap<&'static str, f64>,
    shipping_rates: HashMap<&'static str, f64>,
}

impl Default for OrderProcessor {
    fn default() -> Self {
        Self {
            discount_rules: HashMap::from([
                ("NEW_CUSTOMER", 0.1),
                ("LOYAL_CUSTOMER", 0.15),
                ("HOLIDAY", 0.2),
            ]),
            tax_rates: HashMap::from([("US", 0.08), ("CA", 0.12), ("UK", 0.20)]),
            shipping_rates: HashMap::from([
                ("STANDARD", 5.0),
                ("EXPRESS", 15.0),
                ("OVERNIGHT", 25.0),
            ]),
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

impl OrderProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_order(&self, order: &Value) -> (bool, Option<String>, Option<f64>) {
        let fail = |message: &str| (false, Some(message.to_string()), None);

        if is_empty(&order["items"]) {
            return fail("No items in order");
        }
        if is_empty(&order["customer"]) {
            return fail("No customer information");
        }
        if is_empty(&order["shipping_address"]) {
            return fail("No shipping address");
        }

        let mut subtotal = 0.0;
        for item in order["items"].as_array().into_iter().flatten() {
            if is_empty(&item["price"]) || is_empty(&item["quantity"]) {
                return fail("Invalid item data");
            }
            let price = item["price"].as_f64().unwrap_or_default();
            let quantity = item["quantity"].as_f64().unwrap_or_default();
            subtotal += price * quantity;
        }

        let mut discount = 0.0;
        match order["customer"]["type"].as_str() {
            Some("NEW_CUSTOMER") => discount = subtotal * self.discount_rules["NEW_CUSTOMER"],
            Some("LOYAL_CUSTOMER") => discount = subtotal * self.discount_rules["LOYAL_CUSTOMER"],
            _ => {}
        }
        if self.is_holiday_season() {
            discount = f64::max(discount, subtotal * self.discount_rules["HOLIDAY"]);
        }

        let shipping_cost = match order["shipping_method"].as_str() {
            Some(method) if self.shipping_rates.contains_key(method) => self.shipping_rates[method],
            _ => return fail("Invalid shipping method"),
        };

        let country = order["shipping_address"]["country"].as_str().unwrap_or("US");
        let tax_rate = self
            .tax_rates
            .get(country)
            .copied()
            .unwrap_or(self.tax_rates["US"]);
        let tax_amount = (subtotal - discount) * tax_rate;

        let total = subtotal - discount + shipping_cost + tax_amount;
        if total <= 0.0 {
            return fail("Invalid total amount");
        }
        if total < 10.0 {
            return fail("Order amount too small");
        }
        if total > 10000.0 {
            return fail("Order amount too large");
        }
        (true, None, Some(total))
    }

    fn is_holiday_season(&self) -> bool {
        let now = Local::now().naive_local();
        let start = NaiveDate::from_ymd_opt(now.year(), 11, 15).and_then(|d| d.and_hms_opt(0, 0, 0));
        let end = NaiveDate::from_ymd_opt(now.year(), 12, 31).and_then(|d| d.and_hms_opt(0, 0, 0));
        matches!((start, end), (Some(s), Some(e)) if s <= now && now <= e)
    }
}

#[derive(Debug, Clone)]
pub struct StockRecord {
    pub quantity: i64,
    pub last_updated: NaiveDateTime,
    pub reorder_history: Vec<NaiveDateTime>,
}

/// Stock levels with a fixed threshold, fixed reorder size and a seven-day
/// cooldown measured against `Local::now()`.
#[derive(Debug, Default)]
pub struct InventoryManager {
    pub inventory: HashMap<String, StockRecord>,
}

impl InventoryManager {
    const REORDER_THRESHOLD: i64 = 10;
    const REORDER_QUANTITY: i64 = 50;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_inventory(&mut self, item_id: &str, quantity: i64) -> (bool, Option<String>) {
        let record = self
            .inventory
            .entry(item_id.to_string())
            .or_insert_with(|| StockRecord {
                quantity: 0,
                last_updated: Local::now().naive_local(),
                reorder_history: Vec::new(),
            });

        let new_quantity = record.quantity + quantity;
        if new_quantity < 0 {
            return (false, Some("Insufficient inventory".to_string()));
        }
        record.quantity = new_quantity;
        record.last_updated = Local::now().naive_local();

        if new_quantity <= Self::REORDER_THRESHOLD {
            self.handle_reorder(item_id);
        }
        (true, None)
    }

    fn handle_reorder(&mut self, item_id: &str) {
        let Some(record) = self.inventory.get_mut(item_id) else {
            return;
        };
        let now = Local::now().naive_local();
        if let Some(last) = record.reorder_history.last() {
            if now - *last < TimeDelta::days(7) {
                return;
            }
        }
        record.reorder_history.push(now);
        record.quantity += Self::REORDER_QUANTITY;
    }
}
