//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::Order;

/// Raised once an order has been committed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: i64,
    pub customer_id: i64,
    pub item_count: usize,
    pub total: Decimal,
    pub placed_at: DateTime<Utc>,
}

impl From<&Order> for OrderCreated {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            customer_id: order.customer_id,
            item_count: order.item_count(),
            total: order.total_price(),
            placed_at: order.placed_at,
        }
    }
}
