//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::product::ProductSummary;
use crate::domain::value_objects::Price;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status")]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "P")]
    #[sqlx(rename = "P")]
    Pending,
    #[serde(rename = "C")]
    #[sqlx(rename = "C")]
    Completed,
    #[serde(rename = "F")]
    #[sqlx(rename = "F")]
    Failed,
}

impl PaymentStatus {
    /// Pending settles into Completed or Failed; settled payments stay put.
    pub fn transition(self, next: PaymentStatus) -> Result<PaymentStatus, OrderError> {
        match (self, next) {
            (current, next) if current == next => Ok(current),
            (PaymentStatus::Pending, next) => Ok(next),
            _ => Err(OrderError::PaymentSettled(self)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub placed_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

/// An order line. `unit_price` is the product price at placement time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product: ProductSummary,
    pub unit_price: Price,
    pub quantity: i32,
}

impl OrderItem {
    pub fn total_price(&self) -> Decimal { self.unit_price.times(self.quantity) }
}

impl Order {
    pub fn total_price(&self) -> Decimal { self.items.iter().map(OrderItem::total_price).sum() }
    pub fn item_count(&self) -> usize { self.items.len() }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct PlaceOrder {
    pub cart_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct OrderChanges {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { PaymentSettled(PaymentStatus) }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::PaymentSettled(status) => write!(f, "Payment is already {:?}", status) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_transitions() {
        assert_eq!(PaymentStatus::Pending.transition(PaymentStatus::Completed), Ok(PaymentStatus::Completed));
        assert_eq!(PaymentStatus::Pending.transition(PaymentStatus::Failed), Ok(PaymentStatus::Failed));
        assert_eq!(PaymentStatus::Completed.transition(PaymentStatus::Completed), Ok(PaymentStatus::Completed));
        assert_eq!(
            PaymentStatus::Completed.transition(PaymentStatus::Pending),
            Err(OrderError::PaymentSettled(PaymentStatus::Completed))
        );
        assert!(PaymentStatus::Failed.transition(PaymentStatus::Completed).is_err());
    }

    #[test]
    fn test_order_total() {
        let product = ProductSummary { id: 1, title: "Mug".into(), unit_price: Price::new(dec!(4)).unwrap() };
        let order = Order {
            id: 1,
            customer_id: 1,
            placed_at: Utc::now(),
            payment_status: PaymentStatus::default(),
            items: vec![OrderItem { id: 1, order_id: 1, product, unit_price: Price::new(dec!(3.50)).unwrap(), quantity: 2 }],
        };
        assert_eq!(order.total_price(), dec!(7.00));
        assert_eq!(order.item_count(), 1);
    }
}
