use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum CustomerType {
    #[serde(rename = "NEW_CUSTOMER")]
    #[strum(serialize = "NEW_CUSTOMER")]
    New,
    #[serde(rename = "LOYAL_CUSTOMER")]
    #[strum(serialize = "LOYAL_CUSTOMER")]
    Loyal,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingMethod {
    Standard,
    Express,
    Overnight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub country: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(rename = "type")]
    pub customer_type: CustomerType,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl OrderItem {
    pub fn new(id: impl Into<String>, price: Decimal, quantity: u32) -> Self {
        Self {
            id: id.into(),
            price,
            quantity,
        }
    }

    /// `None` when the product does not fit in a `Decimal`.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// An order to be priced. Customer and address are optional so that
/// incomplete submissions can be represented and rejected by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    pub shipping_method: ShippingMethod,
}

impl Order {
    /// Sum of the item subtotals, `None` on overflow.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.subtotal()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_item_subtotal() {
        assert_eq!(
            OrderItem::new("1", dec!(19.99), 3).subtotal(),
            Some(dec!(59.97))
        );
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(CustomerType::New.to_string(), "NEW_CUSTOMER");
        assert_eq!(CustomerType::from_str("LOYAL_CUSTOMER").unwrap(), CustomerType::Loyal);
        assert_eq!(
            ShippingMethod::iter().map(|m| m.to_string()).collect::<Vec<_>>(),
            vec!["STANDARD", "EXPRESS", "OVERNIGHT"]
        );
    }

    #[test]
    fn test_order_deserializes_from_json() {
        let order: Order = serde_json::from_str(
            r#"{
                "items": [{"id": "1", "price": "10.50", "quantity": 2}],
                "customer": {"id": "c1", "type": "LOYAL_CUSTOMER", "name": "Ada"},
                "shipping_address": {
                    "country": "CA", "street": "1 Main St",
                    "city": "Toronto", "postal_code": "M5V"
                },
                "shipping_method": "EXPRESS"
            }"#,
        )
        .unwrap();

        assert_eq!(order.subtotal(), Some(dec!(21.00)));
        assert_eq!(order.shipping_method, ShippingMethod::Express);
        assert_eq!(order.customer.unwrap().customer_type, CustomerType::Loyal);
    }

    #[test]
    fn test_subtotal_overflow_is_none() {
        assert_eq!(OrderItem::new("1", Decimal::MAX, 2).subtotal(), None);

        let order = Order {
            items: vec![
                OrderItem::new("1", Decimal::MAX, 1),
                OrderItem::new("2", Decimal::MAX, 1),
            ],
            customer: None,
            shipping_address: None,
            shipping_method: ShippingMethod::Standard,
        };
        assert_eq!(order.subtotal(), None);
    }
}
