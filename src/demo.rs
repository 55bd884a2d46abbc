//! Runnable scenarios for every example, used by the binary.
//!
//! Each scenario returns a JSON report. The `untestable` variants run the
//! anti-pattern exactly as written, so they touch the working directory, the
//! wall clock and the network. The `testable` variants are wired from
//! [`AppConfig`] and write only under its workspace root.

use crate::complex_logic::{self, InventoryManager, Order};
use crate::config::AppConfig;
use crate::constructor_side_effects::{self, create_user_service};
use crate::error::Result as CrateResult;
use crate::global_state::{self, Cache};
use crate::hard_coded_dependencies::{self, HttpResponse, HttpSession};
use crate::hidden_side_effects::{self, FileStorage, TracingEventLog, UserData};
use crate::logging::demo_span;
use crate::non_deterministic::{
    self, CacheManager, LineRequest, OrderProcessor as ScheduledOrderProcessor, OrderRequest,
};
use crate::private_method_complexity::{self, create_user_validator};
use crate::providers::{FixedClock, SequenceRandom, SystemClock, TimeProvider};
use crate::tight_coupling::{self, NewOrder, create_order_manager};
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use strum::{Display, EnumIter};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Pattern {
    HardCodedDependencies,
    ConstructorSideEffects,
    GlobalState,
    HiddenSideEffects,
    NonDeterministic,
    TightCoupling,
    ComplexLogic,
    PrivateMethodComplexity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Variant {
    Testable,
    Untestable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoReport {
    pub pattern: Pattern,
    pub variant: Variant,
    pub outcome: Value,
}

pub fn run_demo(config: &AppConfig, pattern: Pattern, variant: Variant) -> Result<DemoReport> {
    let span = demo_span(&pattern.to_string(), &variant.to_string());
    let _entered = span.enter();
    tracing::info!("running demo");

    let outcome = match (pattern, variant) {
        (Pattern::HardCodedDependencies, Variant::Testable) => hard_coded_testable(),
        (Pattern::HardCodedDependencies, Variant::Untestable) => hard_coded_untestable(),
        (Pattern::ConstructorSideEffects, Variant::Testable) => constructor_testable(config),
        (Pattern::ConstructorSideEffects, Variant::Untestable) => constructor_untestable(),
        (Pattern::GlobalState, Variant::Testable) => global_state_testable(),
        (Pattern::GlobalState, Variant::Untestable) => global_state_untestable(),
        (Pattern::HiddenSideEffects, Variant::Testable) => hidden_testable(config),
        (Pattern::HiddenSideEffects, Variant::Untestable) => hidden_untestable(),
        (Pattern::NonDeterministic, Variant::Testable) => non_deterministic_testable(config),
        (Pattern::NonDeterministic, Variant::Untestable) => non_deterministic_untestable(),
        (Pattern::TightCoupling, Variant::Testable) => tight_coupling_testable(config),
        (Pattern::TightCoupling, Variant::Untestable) => tight_coupling_untestable(),
        (Pattern::ComplexLogic, Variant::Testable) => complex_logic_testable(config),
        (Pattern::ComplexLogic, Variant::Untestable) => complex_logic_untestable(),
        (Pattern::PrivateMethodComplexity, Variant::Testable) => private_methods_testable(),
        (Pattern::PrivateMethodComplexity, Variant::Untestable) => private_methods_untestable(),
    }
    .with_context(|| format!("{pattern} demo ({variant}) failed"))?;

    Ok(DemoReport {
        pattern,
        variant,
        outcome,
    })
}

/// Prices the order document at `path` with the configured rate tables.
pub fn price_order_file(config: &AppConfig, path: &Path) -> Result<Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read order {:?}", path))?;
    let order: Order = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse order {:?}", path))?;

    let processor = complex_logic::create_order_processor(&config.pricing, Arc::new(SystemClock));
    Ok(match processor.price_order(&order) {
        Ok(breakdown) => json!({ "success": true, "price": breakdown }),
        Err(error) => json!({ "success": false, "error": error.to_string() }),
    })
}

/// Runs the default user validator over the document at `path`.
pub fn validate_user_file(path: &Path) -> Result<Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read user {:?}", path))?;
    let user: Value = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse user {:?}", path))?;

    let validator = create_user_validator(Vec::new(), None, Arc::new(SystemClock));
    Ok(match validator.validate_user(&user) {
        Ok(()) => json!({ "valid": true }),
        Err(violation) => json!({ "valid": false, "error": violation.to_string() }),
    })
}

fn failure(error: impl std::fmt::Display) -> Value {
    json!({ "success": false, "error": error.to_string() })
}

// ============================================================================
// Hard-coded dependencies
// ============================================================================

/// In-process directory answering the two calls the user service makes.
struct CannedDirectory;

impl HttpSession for CannedDirectory {
    fn get(&self, url: &str) -> CrateResult<HttpResponse> {
        let id = url.rsplit('/').next().unwrap_or_default();
        Ok(match id.parse::<i64>() {
            Ok(id) if id > 0 => HttpResponse::new(200, json!({ "id": id, "name": format!("User {id}") })),
            _ => HttpResponse::new(404, Value::Null),
        })
    }

    fn post(&self, _url: &str, json: &Value) -> CrateResult<HttpResponse> {
        let mut created = json.clone();
        created["id"] = json!(42);
        Ok(HttpResponse::new(201, created))
    }
}

fn hard_coded_testable() -> Result<Value> {
    let service = hard_coded_dependencies::UserService::new(Arc::new(CannedDirectory));
    Ok(json!({
        "get_user": service.get_user(1)?,
        "missing_user": service.get_user(0)?,
        "create_user": service.create_user(&json!({ "name": "New User" }))?,
    }))
}

fn hard_coded_untestable() -> Result<Value> {
    let service = hard_coded_dependencies::untestable::UserService::new();
    Ok(match service.get_user(1) {
        Ok(user) => json!({ "success": true, "get_user": user }),
        Err(error) => failure(error),
    })
}

// ============================================================================
// Constructor side effects
// ============================================================================

fn constructor_testable(config: &AppConfig) -> Result<Value> {
    let settings = config.service_settings();
    let mut service = create_user_service(&settings);
    let db_existed_before_initialize = settings.db_path.exists();

    service.initialize()?;
    let tables = service.user_manager().db().table_names()?;
    let user_settings = service.user_manager().settings().cloned();
    service.cleanup();

    Ok(json!({
        "db_existed_before_initialize": db_existed_before_initialize,
        "tables": tables,
        "settings": user_settings,
        "cache_dir_created": settings.cache_dir.is_dir(),
    }))
}

fn constructor_untestable() -> Result<Value> {
    let before = constructor_side_effects::untestable::database_initialized();
    let service = constructor_side_effects::untestable::UserService::new()?;
    drop(service);
    Ok(json!({
        "database_initialized_before": before,
        "database_initialized_after": constructor_side_effects::untestable::database_initialized(),
        "created": ["app.db", "logs", "config.json", "cache"],
    }))
}

// ============================================================================
// Global state
// ============================================================================

fn global_state_testable() -> Result<Value> {
    let first_cache = Arc::new(Cache::new());
    let second_cache = Arc::new(Cache::new());
    let first = global_state::UserService::new(first_cache.clone());
    let second = global_state::UserService::new(second_cache.clone());

    first.get_user(1);
    first.get_user(1);
    second.get_user(2);

    Ok(json!({
        "first": global_state::UserStats::new(first_cache).cache_stats(),
        "second": global_state::UserStats::new(second_cache).cache_stats(),
    }))
}

fn global_state_untestable() -> Result<Value> {
    let first = global_state::untestable::UserService::new();
    let second = global_state::untestable::UserService::new();

    first.get_user(1);
    first.get_user(1);
    second.get_user(2);

    // both services report the same process-wide counters
    Ok(json!({
        "shared": global_state::untestable::UserStats::new().cache_stats(),
    }))
}

// ============================================================================
// Hidden side effects
// ============================================================================

fn hidden_testable(config: &AppConfig) -> Result<Value> {
    let storage = Arc::new(FileStorage::open(config.resolve_path(&config.data_dir))?);
    let log = Arc::new(TracingEventLog);
    let manager = hidden_side_effects::UserManager::new(storage, log.clone(), Arc::new(SystemClock));
    let validator = hidden_side_effects::UserValidator::new(log);

    let user = UserData::new("demo_user", "demo@example.com");
    let validation = validator.validate_user(&user);
    let created = manager.create_user(user)?;
    let fetched = manager.get_user(&created.username)?;
    let deleted = manager.delete_user(&created.username)?;

    Ok(json!({
        "validation_errors": validation.err().unwrap_or_default(),
        "created": created,
        "fetched": fetched,
        "deleted": deleted,
    }))
}

fn hidden_untestable() -> Result<Value> {
    let manager = hidden_side_effects::untestable::UserManager::new()?;
    let user = json!({ "username": "demo_user", "email": "demo@example.com" });
    let (valid, errors) = hidden_side_effects::untestable::UserValidator.validate_user(&user);

    let created = manager.create_user(&user)?;
    let fetched = manager.get_user("demo_user")?;
    let deleted = manager.delete_user("demo_user")?;

    Ok(json!({
        "valid": valid,
        "validation_errors": errors,
        "created": created,
        "fetched": fetched,
        "deleted": deleted,
    }))
}

// ============================================================================
// Non-deterministic
// ============================================================================

fn at_hour(clock: &dyn TimeProvider, hour: u32) -> NaiveDateTime {
    let now = clock.now();
    now.date().and_hms_opt(hour, 0, 0).unwrap_or(now)
}

fn sample_request() -> OrderRequest {
    OrderRequest {
        id: "order-1".to_string(),
        customer_id: "customer-1".to_string(),
        customer_email: "customer@example.com".to_string(),
        items: vec![LineRequest {
            id: "item-1".to_string(),
            quantity: 2,
        }],
        total: Decimal::from(100),
        shipping_address: None,
    }
}

fn non_deterministic_testable(config: &AppConfig) -> Result<Value> {
    let hours = config.business_hours;
    let clock = Arc::new(FixedClock::new(at_hour(&SystemClock, hours.start)));
    let processor = ScheduledOrderProcessor::new(
        clock.clone(),
        Arc::new(SequenceRandom::new(vec![0.5])),
        Arc::new(non_deterministic::testable::AlwaysAvailableInventory),
        Arc::new(non_deterministic::testable::OpenCreditLine),
        Arc::new(non_deterministic::testable::DomesticShipping),
        Arc::new(non_deterministic::testable::LoggingEmailService),
    )
    .with_business_hours(hours);

    let order = sample_request();
    let during_hours = processor
        .process_orders(std::slice::from_ref(&order))
        .into_iter()
        .all(|result| result.is_ok());
    let simulated_sleep_secs: f64 = clock.sleeps().iter().map(|d| d.as_secs_f64()).sum();

    clock.set(at_hour(clock.as_ref(), hours.start.saturating_sub(1)));
    let before_opening = processor.process_order(&order).err().map(|e| e.to_string());

    let mut cache = CacheManager::with_max_age(clock.clone(), config.cache_max_age());
    cache.set("greeting", "hello".to_string());
    let fresh = cache.get("greeting");
    clock.advance(config.cache_max_age() + TimeDelta::seconds(1));
    let expired = cache.get("greeting");

    Ok(json!({
        "during_hours": during_hours,
        "before_opening": before_opening,
        "simulated_sleep_secs": simulated_sleep_secs,
        "last_processed_id": processor.last_processed_id(),
        "cache_fresh": fresh,
        "cache_after_max_age": expired,
    }))
}

fn non_deterministic_untestable() -> Result<Value> {
    let mut processor = non_deterministic::untestable::OrderProcessor::new();
    let (success, error) = processor.process_order(&sample_request());
    Ok(json!({ "success": success, "error": error }))
}

// ============================================================================
// Tight coupling
// ============================================================================

fn sample_new_order() -> NewOrder {
    NewOrder {
        customer_id: 1,
        customer_email: "customer@example.com".to_string(),
        total_amount: 99.5,
        status: "pending".to_string(),
    }
}

fn tight_coupling_testable(config: &AppConfig) -> Result<Value> {
    let manager = create_order_manager(&config.order_settings())?;
    let record = manager.handle_new_order(&sample_new_order())?;
    Ok(json!({ "order": record }))
}

fn tight_coupling_untestable() -> Result<Value> {
    let manager = tight_coupling::untestable::OrderManager::new()?;
    let record = manager.handle_new_order(&sample_new_order())?;
    Ok(json!({ "order": record }))
}

// ============================================================================
// Complex logic
// ============================================================================

fn sample_order() -> Value {
    json!({
        "items": [{ "id": "1", "price": 100, "quantity": 2 }],
        "customer": { "id": "c1", "type": "NEW_CUSTOMER", "name": "Test Customer" },
        "shipping_address": {
            "country": "US",
            "street": "123 Main St",
            "city": "San Francisco",
            "postal_code": "94105"
        },
        "shipping_method": "STANDARD"
    })
}

fn complex_logic_testable(config: &AppConfig) -> Result<Value> {
    let clock: Arc<dyn TimeProvider> = Arc::new(SystemClock);
    let order: Order = serde_json::from_value(sample_order())?;
    let processor = complex_logic::create_order_processor(&config.pricing, clock.clone());
    let price = match processor.price_order(&order) {
        Ok(breakdown) => json!(breakdown),
        Err(error) => failure(error),
    };

    let mut inventory = InventoryManager::new(Arc::new(config.reorder_policy(clock.clone())), clock);
    inventory.update_inventory("1", 5)?;
    let oversold = inventory.update_inventory("1", -1_000).err().map(|e| e.to_string());

    Ok(json!({
        "price": price,
        "inventory": inventory.item("1"),
        "oversold": oversold,
    }))
}

fn complex_logic_untestable() -> Result<Value> {
    let processor = complex_logic::untestable::OrderProcessor::new();
    let (success, error, total) = processor.process_order(&sample_order());

    let mut inventory = complex_logic::untestable::InventoryManager::new();
    let (updated, update_error) = inventory.update_inventory("1", 5);

    Ok(json!({
        "success": success,
        "error": error,
        "total": total,
        "inventory_updated": updated,
        "inventory_error": update_error,
    }))
}

// ============================================================================
// Private method complexity
// ============================================================================

fn sample_users() -> Vec<Value> {
    let valid = json!({
        "username": "test_user",
        "password": "TestPass123!",
        "email": "test@example.com",
        "age": 25,
        "address": {
            "street": "123 Main St",
            "city": "San Francisco",
            "state": "CA",
            "zip_code": "94105",
            "country": "USA"
        }
    });
    let mut weak_password = valid.clone();
    weak_password["password"] = json!("testpass123!");
    let mut bad_zip = valid.clone();
    bad_zip["address"]["zip_code"] = json!("9410");
    vec![valid, weak_password, bad_zip]
}

fn private_methods_testable() -> Result<Value> {
    let validator = create_user_validator(Vec::new(), None, Arc::new(SystemClock));
    let results: Vec<Value> = sample_users()
        .iter()
        .map(|user| match validator.validate_user(user) {
            Ok(()) => json!({ "valid": true }),
            Err(violation) => json!({ "valid": false, "error": violation.to_string() }),
        })
        .collect();
    Ok(json!({ "results": results }))
}

fn private_methods_untestable() -> Result<Value> {
    let validator = private_method_complexity::untestable::UserValidator::new();
    let results: Vec<Value> = sample_users()
        .iter()
        .map(|user| {
            let (valid, error) = validator.validate_user(user);
            json!({ "valid": valid, "error": error })
        })
        .collect();
    Ok(json!({ "results": results }))
}
