use crate::providers::TimeProvider;
use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("Insufficient inventory")]
    Insufficient,

    #[error("Inventory quantity out of range")]
    QuantityOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    pub item_id: String,
    pub quantity: i64,
    pub last_updated: NaiveDateTime,
    pub reorder_history: Vec<NaiveDateTime>,
}

impl InventoryItem {
    pub fn new(item_id: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            item_id: item_id.into(),
            quantity: 0,
            last_updated: now,
            reorder_history: Vec::new(),
        }
    }

    pub fn last_reorder(&self) -> Option<NaiveDateTime> {
        self.reorder_history.last().copied()
    }
}

/// Decides whether an item needs restocking and by how much.
pub trait ReorderDecision: Send + Sync {
    fn should_reorder(&self, item: &InventoryItem) -> bool;
    fn reorder_quantity(&self) -> i64;
}

/// Reorders at or below `threshold`, at most once per `cooldown`.
///
/// A cooldown too long for `TimeDelta` saturates, so the item is never
/// reordered twice.
pub struct ReorderPolicy {
    threshold: i64,
    quantity: i64,
    cooldown: TimeDelta,
    clock: Arc<dyn TimeProvider>,
}

impl ReorderPolicy {
    pub fn new(
        threshold: i64,
        quantity: i64,
        cooldown_days: i64,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            threshold,
            quantity,
            cooldown: TimeDelta::try_days(cooldown_days).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }
}

impl ReorderDecision for ReorderPolicy {
    fn should_reorder(&self, item: &InventoryItem) -> bool {
        if item.quantity > self.threshold {
            return false;
        }
        match item.last_reorder() {
            Some(last) => self.clock.now() - last >= self.cooldown,
            None => true,
        }
    }

    fn reorder_quantity(&self) -> i64 {
        self.quantity
    }
}

pub struct InventoryManager {
    items: HashMap<String, InventoryItem>,
    policy: Arc<dyn ReorderDecision>,
    clock: Arc<dyn TimeProvider>,
}

impl InventoryManager {
    pub fn new(policy: Arc<dyn ReorderDecision>, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            items: HashMap::new(),
            policy,
            clock,
        }
    }

    pub fn item(&self, item_id: &str) -> Option<&InventoryItem> {
        self.items.get(item_id)
    }

    /// Applies `delta` to the item's stock, creating unknown items at zero.
    ///
    /// A change that would leave negative stock, or more stock than an `i64`
    /// holds, is rejected and leaves the quantity untouched. The item record
    /// itself is still created. A reorder that would overflow is rejected
    /// after the stock change has been applied.
    pub fn update_inventory(&mut self, item_id: &str, delta: i64) -> Result<(), InventoryError> {
        let now = self.clock.now();
        let item = self
            .items
            .entry(item_id.to_string())
            .or_insert_with(|| InventoryItem::new(item_id, now));

        let new_quantity = item
            .quantity
            .checked_add(delta)
            .ok_or(InventoryError::QuantityOverflow)?;
        if new_quantity < 0 {
            tracing::debug!(item_id, delta, stock = item.quantity, "rejected stock change");
            return Err(InventoryError::Insufficient);
        }

        item.quantity = new_quantity;
        item.last_updated = now;

        if self.policy.should_reorder(item) {
            let restocked = item
                .quantity
                .checked_add(self.policy.reorder_quantity())
                .ok_or(InventoryError::QuantityOverflow)?;
            item.reorder_history.push(now);
            item.quantity = restocked;
            tracing::info!(item_id, quantity = item.quantity, "reorder placed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FixedClock;
    use chrono::NaiveDate;
    use parking_lot::Mutex;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn item_with(quantity: i64) -> InventoryItem {
        InventoryItem {
            quantity,
            ..InventoryItem::new("1", start())
        }
    }

    struct StubPolicy {
        reorder: bool,
        calls: Mutex<usize>,
    }

    impl StubPolicy {
        fn new(reorder: bool) -> Arc<Self> {
            Arc::new(Self {
                reorder,
                calls: Mutex::new(0),
            })
        }
    }

    impl ReorderDecision for StubPolicy {
        fn should_reorder(&self, _item: &InventoryItem) -> bool {
            *self.calls.lock() += 1;
            self.reorder
        }

        fn reorder_quantity(&self) -> i64 {
            50
        }
    }

    // =========================================================================
    // ReorderPolicy
    // =========================================================================

    #[test]
    fn test_should_reorder_below_threshold() {
        let policy = ReorderPolicy::new(10, 50, 7, Arc::new(FixedClock::new(start())));
        assert!(policy.should_reorder(&item_with(5)));
        assert!(policy.should_reorder(&item_with(10)), "threshold is inclusive");
    }

    #[test]
    fn test_should_not_reorder_above_threshold() {
        let policy = ReorderPolicy::new(10, 50, 7, Arc::new(FixedClock::new(start())));
        assert!(!policy.should_reorder(&item_with(15)));
    }

    #[test]
    fn test_should_not_reorder_during_cooldown() {
        let policy = ReorderPolicy::new(10, 50, 7, Arc::new(FixedClock::new(start())));
        let mut item = item_with(5);
        item.reorder_history.push(start() - TimeDelta::days(3));

        assert!(!policy.should_reorder(&item));
    }

    #[test]
    fn test_reorders_again_after_cooldown() {
        let policy = ReorderPolicy::new(10, 50, 7, Arc::new(FixedClock::new(start())));
        let mut item = item_with(5);
        item.reorder_history.push(start() - TimeDelta::days(7));

        assert!(policy.should_reorder(&item));
    }

    // =========================================================================
    // InventoryManager
    // =========================================================================

    #[test]
    fn test_update_inventory_success() {
        let clock = Arc::new(FixedClock::new(start()));
        let mut manager = InventoryManager::new(StubPolicy::new(false), clock);

        manager.update_inventory("1", 10).unwrap();

        let item = manager.item("1").unwrap();
        assert_eq!(item.quantity, 10);
        assert_eq!(item.last_updated, start());
    }

    #[test]
    fn test_update_inventory_insufficient() {
        let clock = Arc::new(FixedClock::new(start()));
        let mut manager = InventoryManager::new(StubPolicy::new(false), clock);

        let err = manager.update_inventory("1", -20).unwrap_err();

        assert_eq!(err.to_string(), "Insufficient inventory");
        assert_eq!(manager.item("1").map(|i| i.quantity), Some(0));
    }

    #[test]
    fn test_update_inventory_reorder() {
        let clock = Arc::new(FixedClock::new(start()));
        let policy = StubPolicy::new(true);
        let mut manager = InventoryManager::new(policy.clone(), clock);

        manager.update_inventory("1", 10).unwrap();

        assert_eq!(*policy.calls.lock(), 1);
        let item = manager.item("1").unwrap();
        assert_eq!(item.quantity, 60);
        assert_eq!(item.reorder_history, vec![start()]);
    }

    #[test]
    fn test_update_inventory_overflow_is_rejected() {
        let clock = Arc::new(FixedClock::new(start()));
        let mut manager = InventoryManager::new(StubPolicy::new(false), clock);

        manager.update_inventory("a", i64::MAX - 10).unwrap();
        let err = manager.update_inventory("a", 100).unwrap_err();

        assert_eq!(err, InventoryError::QuantityOverflow);
        assert_eq!(err.to_string(), "Inventory quantity out of range");
        assert_eq!(manager.item("a").unwrap().quantity, i64::MAX - 10);
    }

    #[test]
    fn test_reorder_overflow_is_rejected() {
        struct HugeReorder;

        impl ReorderDecision for HugeReorder {
            fn should_reorder(&self, _item: &InventoryItem) -> bool {
                true
            }

            fn reorder_quantity(&self) -> i64 {
                i64::MAX
            }
        }

        let clock = Arc::new(FixedClock::new(start()));
        let mut manager = InventoryManager::new(Arc::new(HugeReorder), clock);

        assert_eq!(
            manager.update_inventory("a", 5),
            Err(InventoryError::QuantityOverflow)
        );
        let item = manager.item("a").unwrap();
        assert_eq!(item.quantity, 5);
        assert!(item.reorder_history.is_empty());
    }

    #[test]
    fn test_out_of_range_cooldown_saturates() {
        let clock = Arc::new(FixedClock::new(start()));
        let policy = ReorderPolicy::new(10, 50, i64::MAX, clock.clone());
        let mut item = item_with(5);
        assert!(policy.should_reorder(&item));

        item.reorder_history.push(start() - TimeDelta::days(100_000));
        assert!(!policy.should_reorder(&item));
    }

    #[test]
    fn test_reorder_suppressed_within_cooldown() {
        let clock = Arc::new(FixedClock::new(start()));
        let policy = Arc::new(ReorderPolicy::new(10, 50, 7, clock.clone()));
        let mut manager = InventoryManager::new(policy, clock.clone());

        manager.update_inventory("widget", 5).unwrap();
        assert_eq!(manager.item("widget").unwrap().quantity, 55);

        clock.advance(TimeDelta::days(2));
        manager.update_inventory("widget", -50).unwrap();
        assert_eq!(
            manager.item("widget").unwrap().quantity,
            5,
            "second reorder must wait for the cooldown"
        );

        clock.advance(TimeDelta::days(5));
        manager.update_inventory("widget", 0).unwrap();
        assert_eq!(manager.item("widget").unwrap().quantity, 55);
        assert_eq!(manager.item("widget").unwrap().reorder_history.len(), 2);
    }
}
