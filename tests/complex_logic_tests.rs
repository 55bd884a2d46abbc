mod support;

use std::collections::HashMap;
use std::sync::Arc;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use support::{at, fixed_clock};
use testability_patterns::complex_logic::{
    Address, Customer, CustomerType, InventoryError, InventoryManager, Order, OrderError,
    OrderItem, PricingError, PricingTables, ReorderPolicy, ShippingMethod, create_order_processor,
};
use testability_patterns::config::ReorderSettings;
use testability_patterns::{AppConfig, FixedClock, TimeProvider};
use chrono::TimeDelta;

fn order(customer_type: CustomerType, country: &str, method: ShippingMethod) -> Order {
    Order {
        items: vec![OrderItem::new("1", dec!(100), 2)],
        customer: Some(Customer {
            id: "c1".to_string(),
            customer_type,
            name: "Test Customer".to_string(),
        }),
        shipping_address: Some(Address {
            country: country.to_string(),
            street: "123 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
        }),
        shipping_method: method,
    }
}

fn total_on(day: (i32, u32, u32), order: &Order) -> Result<Decimal, OrderError> {
    let clock = fixed_clock(at(day.0, day.1, day.2, 12, 0));
    create_order_processor(&PricingTables::default(), clock).process_order(order)
}

// =============================================================================
// Pricing with the default tables
// =============================================================================

#[test]
fn test_default_tables_price_outside_holidays() {
    let cases = [
        (CustomerType::New, "US", ShippingMethod::Standard, dec!(199.40)),
        (CustomerType::Loyal, "US", ShippingMethod::Standard, dec!(188.60)),
        (CustomerType::New, "CA", ShippingMethod::Standard, dec!(206.60)),
        (CustomerType::New, "FR", ShippingMethod::Standard, dec!(199.40)),
        (CustomerType::New, "US", ShippingMethod::Overnight, dec!(219.40)),
    ];
    for (tier, country, method, expected) in cases {
        let total = total_on((2024, 6, 1), &order(tier, country, method)).unwrap();
        assert_eq!(total, expected, "{tier} / {country} / {method}");
    }
}

#[test]
fn test_holiday_window_boundaries() {
    let new_us = order(CustomerType::New, "US", ShippingMethod::Standard);
    assert_eq!(total_on((2024, 11, 14), &new_us).unwrap(), dec!(199.40));
    assert_eq!(total_on((2024, 11, 15), &new_us).unwrap(), dec!(177.80));
    assert_eq!(total_on((2024, 12, 31), &new_us).unwrap(), dec!(177.80));
    assert_eq!(total_on((2025, 1, 1), &new_us).unwrap(), dec!(199.40));
}

#[test]
fn test_breakdown_components() {
    let clock = fixed_clock(at(2024, 6, 1, 12, 0));
    let processor = create_order_processor(&PricingTables::default(), clock);

    let breakdown = processor
        .price_order(&order(CustomerType::New, "US", ShippingMethod::Express))
        .unwrap();

    assert_eq!(breakdown.subtotal, dec!(200));
    assert_eq!(breakdown.discount, dec!(20));
    assert_eq!(breakdown.shipping, dec!(15));
    assert_eq!(breakdown.tax, dec!(14.40));
    assert_eq!(breakdown.total, dec!(209.40));
}

#[test]
fn test_amount_limits() {
    let mut small = order(CustomerType::New, "US", ShippingMethod::Standard);
    small.items = vec![OrderItem::new("1", dec!(1), 1)];
    assert_eq!(total_on((2024, 6, 1), &small), Err(OrderError::TooSmall));

    let mut large = order(CustomerType::New, "US", ShippingMethod::Standard);
    large.items = vec![OrderItem::new("1", dec!(5000), 3)];
    assert_eq!(total_on((2024, 6, 1), &large), Err(OrderError::TooLarge));
}

#[test]
fn test_validation_runs_before_pricing() {
    let mut no_items = order(CustomerType::New, "US", ShippingMethod::Standard);
    no_items.items.clear();
    assert_eq!(total_on((2024, 6, 1), &no_items), Err(OrderError::NoItems));

    let mut free = order(CustomerType::New, "US", ShippingMethod::Standard);
    free.items = vec![OrderItem::new("1", Decimal::ZERO, 1)];
    let err = total_on((2024, 6, 1), &free).unwrap_err();
    assert_eq!(err.to_string(), "Invalid item data");
}

#[test]
fn test_incomplete_rate_table_is_reported() {
    let tables = PricingTables {
        shipping_rates: HashMap::from([(ShippingMethod::Standard, dec!(5))]),
        ..PricingTables::default()
    };
    let processor = create_order_processor(&tables, fixed_clock(at(2024, 6, 1, 12, 0)));

    let err = processor
        .process_order(&order(CustomerType::New, "US", ShippingMethod::Overnight))
        .unwrap_err();

    assert_matches!(
        err,
        OrderError::Pricing(PricingError::MissingShippingRate(ShippingMethod::Overnight))
    );
    assert_eq!(err.to_string(), "No shipping rate configured for OVERNIGHT");
}

// =============================================================================
// Inventory
// =============================================================================

fn inventory(clock: Arc<FixedClock>, settings: ReorderSettings) -> InventoryManager {
    let config = AppConfig {
        reorder: settings,
        ..AppConfig::default()
    };
    let clock: Arc<dyn TimeProvider> = clock;
    InventoryManager::new(Arc::new(config.reorder_policy(clock.clone())), clock)
}

#[test]
fn test_configured_reorder_policy_and_cooldown() {
    let clock = fixed_clock(at(2024, 1, 10, 9, 0));
    let mut manager = inventory(clock.clone(), ReorderSettings::default());

    manager.update_inventory("widget", 100).unwrap();
    manager.update_inventory("widget", -95).unwrap();
    assert_eq!(manager.item("widget").unwrap().quantity, 55, "5 left, 50 reordered");

    manager.update_inventory("widget", -50).unwrap();
    assert_eq!(
        manager.item("widget").unwrap().quantity,
        5,
        "second reorder suppressed within cooldown"
    );

    clock.advance(TimeDelta::days(7));
    manager.update_inventory("widget", 0).unwrap();
    let item = manager.item("widget").unwrap();
    assert_eq!(item.quantity, 55);
    assert_eq!(
        item.reorder_history,
        vec![at(2024, 1, 10, 9, 0), at(2024, 1, 17, 9, 0)]
    );
}

#[test]
fn test_overdraw_is_rejected_without_changing_stock() {
    let clock = fixed_clock(at(2024, 1, 10, 9, 0));
    let mut manager = inventory(
        clock,
        ReorderSettings {
            threshold: 0,
            quantity: 10,
            cooldown_days: 1,
        },
    );

    manager.update_inventory("gadget", 3).unwrap();
    assert_eq!(
        manager.update_inventory("gadget", -4),
        Err(InventoryError::Insufficient)
    );
    assert_eq!(manager.item("gadget").unwrap().quantity, 3);
}

#[test]
fn test_reorder_policy_can_be_used_directly() {
    let clock = fixed_clock(at(2024, 1, 10, 9, 0));
    let policy = ReorderPolicy::new(10, 50, 7, clock.clone());
    let mut manager = InventoryManager::new(Arc::new(policy), clock);

    manager.update_inventory("bolt", 20).unwrap();
    assert!(manager.item("bolt").unwrap().reorder_history.is_empty());
}
