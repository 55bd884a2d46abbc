use super::model::{CustomerType, Order, ShippingMethod};
use crate::providers::TimeProvider;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

const HOLIDAY_KEY: &str = "HOLIDAY";
const DEFAULT_TAX_COUNTRY: &str = "US";

/// A rate table is missing an entry the calculation needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("No discount rate configured for {0}")]
    MissingDiscountRate(String),

    #[error("No tax rate configured for {0}")]
    MissingTaxRate(String),

    #[error("No shipping rate configured for {0}")]
    MissingShippingRate(ShippingMethod),

    #[error("Amount out of range")]
    Overflow,
}

/// Reasons an order cannot be priced. `Display` gives the customer-facing
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("No items in order")]
    NoItems,

    #[error("No customer information")]
    NoCustomer,

    #[error("No shipping address")]
    NoShippingAddress,

    #[error("Invalid item data")]
    InvalidItem,

    #[error("Invalid total amount")]
    InvalidTotal,

    #[error("Order amount too small")]
    TooSmall,

    #[error("Order amount too large")]
    TooLarge,

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

// ============================================================================
// Rules
// ============================================================================

pub trait DiscountPolicy: Send + Sync {
    fn calculate_discount(
        &self,
        subtotal: Decimal,
        customer_type: CustomerType,
        is_holiday: bool,
    ) -> Result<Decimal, PricingError>;
}

pub trait TaxPolicy: Send + Sync {
    fn calculate_tax(&self, amount: Decimal, country: &str) -> Result<Decimal, PricingError>;
}

pub trait ShippingPolicy: Send + Sync {
    fn calculate_shipping(&self, method: ShippingMethod) -> Result<Decimal, PricingError>;
}

pub trait OrderValidation: Send + Sync {
    fn validate_order(&self, order: &Order) -> Result<(), OrderError>;
}

pub trait HolidayCalendar: Send + Sync {
    fn is_holiday_season(&self) -> bool;
}

/// Rates keyed by customer tier name plus `HOLIDAY`.
#[derive(Debug, Clone)]
pub struct DiscountCalculator {
    rules: HashMap<String, Decimal>,
}

impl DiscountCalculator {
    pub fn new(rules: HashMap<String, Decimal>) -> Self {
        Self { rules }
    }

    fn rate(&self, key: &str) -> Result<Decimal, PricingError> {
        self.rules
            .get(key)
            .copied()
            .ok_or_else(|| PricingError::MissingDiscountRate(key.to_string()))
    }
}

impl DiscountPolicy for DiscountCalculator {
    /// The larger of the tier discount and, during the holidays, the holiday
    /// discount.
    fn calculate_discount(
        &self,
        subtotal: Decimal,
        customer_type: CustomerType,
        is_holiday: bool,
    ) -> Result<Decimal, PricingError> {
        let customer_discount = subtotal
            .checked_mul(self.rate(customer_type.as_ref())?)
            .ok_or(PricingError::Overflow)?;
        if !is_holiday {
            return Ok(customer_discount);
        }
        let holiday_discount = subtotal
            .checked_mul(self.rate(HOLIDAY_KEY)?)
            .ok_or(PricingError::Overflow)?;
        Ok(customer_discount.max(holiday_discount))
    }
}

#[derive(Debug, Clone)]
pub struct TaxCalculator {
    rates: HashMap<String, Decimal>,
}

impl TaxCalculator {
    pub fn new(rates: HashMap<String, Decimal>) -> Self {
        Self { rates }
    }
}

impl TaxPolicy for TaxCalculator {
    /// Unknown countries are taxed at the US rate.
    fn calculate_tax(&self, amount: Decimal, country: &str) -> Result<Decimal, PricingError> {
        let rate = self
            .rates
            .get(country)
            .or_else(|| self.rates.get(DEFAULT_TAX_COUNTRY))
            .copied()
            .ok_or_else(|| PricingError::MissingTaxRate(DEFAULT_TAX_COUNTRY.to_string()))?;
        amount.checked_mul(rate).ok_or(PricingError::Overflow)
    }
}

#[derive(Debug, Clone)]
pub struct ShippingCalculator {
    rates: HashMap<ShippingMethod, Decimal>,
}

impl ShippingCalculator {
    pub fn new(rates: HashMap<ShippingMethod, Decimal>) -> Self {
        Self { rates }
    }
}

impl ShippingPolicy for ShippingCalculator {
    fn calculate_shipping(&self, method: ShippingMethod) -> Result<Decimal, PricingError> {
        self.rates
            .get(&method)
            .copied()
            .ok_or(PricingError::MissingShippingRate(method))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OrderValidator;

impl OrderValidation for OrderValidator {
    fn validate_order(&self, order: &Order) -> Result<(), OrderError> {
        if order.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if order.customer.is_none() {
            return Err(OrderError::NoCustomer);
        }
        if order.shipping_address.is_none() {
            return Err(OrderError::NoShippingAddress);
        }
        if order
            .items
            .iter()
            .any(|item| item.price.is_zero() || item.quantity == 0)
        {
            return Err(OrderError::InvalidItem);
        }
        Ok(())
    }
}

/// Nov 15 through Dec 31 of the clock's current year, whole days inclusive.
pub struct HolidayChecker {
    clock: Arc<dyn TimeProvider>,
}

impl HolidayChecker {
    pub fn new(clock: Arc<dyn TimeProvider>) -> Self {
        Self { clock }
    }
}

impl HolidayCalendar for HolidayChecker {
    fn is_holiday_season(&self) -> bool {
        let today = self.clock.now().date();
        let year = today.year();
        match (
            NaiveDate::from_ymd_opt(year, 11, 15),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ) {
            (Some(start), Some(end)) => (start..=end).contains(&today),
            _ => false,
        }
    }
}

// ============================================================================
// Processor
// ============================================================================

/// Every component of a priced order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

pub struct OrderProcessor {
    discounts: Arc<dyn DiscountPolicy>,
    taxes: Arc<dyn TaxPolicy>,
    shipping: Arc<dyn ShippingPolicy>,
    validator: Arc<dyn OrderValidation>,
    holidays: Arc<dyn HolidayCalendar>,
}

impl OrderProcessor {
    pub fn new(
        discounts: Arc<dyn DiscountPolicy>,
        taxes: Arc<dyn TaxPolicy>,
        shipping: Arc<dyn ShippingPolicy>,
        validator: Arc<dyn OrderValidation>,
        holidays: Arc<dyn HolidayCalendar>,
    ) -> Self {
        Self {
            discounts,
            taxes,
            shipping,
            validator,
            holidays,
        }
    }

    /// Returns the order total.
    pub fn process_order(&self, order: &Order) -> Result<Decimal, OrderError> {
        self.price_order(order).map(|breakdown| breakdown.total)
    }

    /// Validates, prices and range-checks `order`.
    ///
    /// Tax applies to the discounted subtotal; shipping is added untaxed.
    pub fn price_order(&self, order: &Order) -> Result<PriceBreakdown, OrderError> {
        self.validator.validate_order(order)?;
        let customer = order.customer.as_ref().ok_or(OrderError::NoCustomer)?;
        let address = order
            .shipping_address
            .as_ref()
            .ok_or(OrderError::NoShippingAddress)?;

        let subtotal = order.subtotal().ok_or(OrderError::TooLarge)?;
        let discount = self
            .discounts
            .calculate_discount(
                subtotal,
                customer.customer_type,
                self.holidays.is_holiday_season(),
            )
            .map_err(overflow_is_too_large)?;
        let shipping = self
            .shipping
            .calculate_shipping(order.shipping_method)
            .map_err(overflow_is_too_large)?;
        let taxable = subtotal.checked_sub(discount).ok_or(OrderError::TooLarge)?;
        let tax = self
            .taxes
            .calculate_tax(taxable, &address.country)
            .map_err(overflow_is_too_large)?;
        let total = taxable
            .checked_add(shipping)
            .and_then(|sum| sum.checked_add(tax))
            .ok_or(OrderError::TooLarge)?;

        if total <= Decimal::ZERO {
            return Err(OrderError::InvalidTotal);
        }
        if total < Decimal::TEN {
            return Err(OrderError::TooSmall);
        }
        if total > Decimal::from(10_000) {
            return Err(OrderError::TooLarge);
        }

        tracing::debug!(%subtotal, %discount, %shipping, %tax, %total, "order priced");
        Ok(PriceBreakdown {
            subtotal,
            discount,
            shipping,
            tax,
            total,
        })
    }
}

/// Amounts beyond `Decimal` range are far above the order ceiling.
fn overflow_is_too_large(error: PricingError) -> OrderError {
    match error {
        PricingError::Overflow => OrderError::TooLarge,
        other => OrderError::Pricing(other),
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// Rate tables for the concrete calculators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTables {
    pub discount_rates: HashMap<String, Decimal>,
    pub tax_rates: HashMap<String, Decimal>,
    pub shipping_rates: HashMap<ShippingMethod, Decimal>,
}

impl Default for PricingTables {
    fn default() -> Self {
        let discount_rates = HashMap::from([
            (CustomerType::New.to_string(), Decimal::new(10, 2)),
            (CustomerType::Loyal.to_string(), Decimal::new(15, 2)),
            (HOLIDAY_KEY.to_string(), Decimal::new(20, 2)),
        ]);
        let tax_rates = HashMap::from([
            ("US".to_string(), Decimal::new(8, 2)),
            ("CA".to_string(), Decimal::new(12, 2)),
            ("UK".to_string(), Decimal::new(20, 2)),
        ]);
        let shipping_rates = HashMap::from([
            (ShippingMethod::Standard, Decimal::from(5)),
            (ShippingMethod::Express, Decimal::from(15)),
            (ShippingMethod::Overnight, Decimal::from(25)),
        ]);
        Self {
            discount_rates,
            tax_rates,
            shipping_rates,
        }
    }
}

pub fn create_order_processor(
    tables: &PricingTables,
    clock: Arc<dyn TimeProvider>,
) -> OrderProcessor {
    OrderProcessor::new(
        Arc::new(DiscountCalculator::new(tables.discount_rates.clone())),
        Arc::new(TaxCalculator::new(tables.tax_rates.clone())),
        Arc::new(ShippingCalculator::new(tables.shipping_rates.clone())),
        Arc::new(OrderValidator),
        Arc::new(HolidayChecker::new(clock)),
    )
}
