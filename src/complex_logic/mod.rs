//! Complex logic
//!
//! [`untestable::OrderProcessor`] prices an order in one method: validation,
//! discounts, the holiday check against the wall clock, shipping, tax and the
//! amount limits are interleaved. The refactor splits each rule into its own
//! calculator behind a trait ([`pricing`]), models the order explicitly
//! ([`model`]) and gives inventory reordering an injectable policy
//! ([`inventory`]).

pub mod inventory;
pub mod model;
pub mod pricing;
pub mod untestable;

pub use inventory::{InventoryError, InventoryItem, InventoryManager, ReorderDecision, ReorderPolicy};
pub use model::{Address, Customer, CustomerType, Order, OrderItem, ShippingMethod};
pub use pricing::{
    DiscountCalculator, DiscountPolicy, HolidayCalendar, HolidayChecker, OrderError,
    OrderProcessor, OrderValidation, OrderValidator, PriceBreakdown, PricingError, PricingTables,
    ShippingCalculator, ShippingPolicy, TaxCalculator, TaxPolicy, create_order_processor,
};
