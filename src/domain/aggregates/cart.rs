//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::product::ProductSummary;

/// Largest quantity a single cart line may hold.
pub const MAX_QUANTITY: i32 = 32_767;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: Uuid,
    pub product: ProductSummary,
    pub quantity: i32,
}

impl CartItem {
    pub fn total_price(&self) -> Decimal { self.product.unit_price.times(self.quantity) }
}

impl Cart {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(), created_at: Utc::now(), items: vec![] }
    }

    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Sum of quantity times the current unit price over all lines.
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartItem::total_price).sum()
    }
}

impl Default for Cart { fn default() -> Self { Self::new() } }

/// Quantity of a line after adding `more` to it, or `None` past [`MAX_QUANTITY`].
pub fn merged_quantity(current: i32, more: i32) -> Option<i32> {
    current.checked_add(more).filter(|quantity| *quantity <= MAX_QUANTITY)
}

/// Adding a product already in the cart increments its quantity.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewCartItem {
    pub product_id: i64,
    #[validate(range(min = 1, max = 32767))]
    pub quantity: i32,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CartItemChanges {
    #[validate(range(min = 1, max = 32767))]
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Price;
    use rust_decimal_macros::dec;

    fn line(id: i64, price: Decimal, quantity: i32) -> CartItem {
        CartItem {
            id,
            cart_id: Uuid::nil(),
            product: ProductSummary { id, title: format!("P{id}"), unit_price: Price::new(price).unwrap() },
            quantity,
        }
    }

    #[test]
    fn test_cart_totals() {
        let mut cart = Cart::new();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
        cart.items.push(line(1, dec!(10), 2));
        cart.items.push(line(2, dec!(2.50), 3));
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.items[1].total_price(), dec!(7.50));
        assert_eq!(cart.total_price(), dec!(27.50));
    }

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(NewCartItem { product_id: 1, quantity: 0 }.validate().is_err());
        assert!(CartItemChanges { quantity: 3 }.validate().is_ok());
        assert!(NewCartItem { product_id: 1, quantity: MAX_QUANTITY }.validate().is_ok());
        assert!(NewCartItem { product_id: 1, quantity: MAX_QUANTITY + 1 }.validate().is_err());
        assert!(CartItemChanges { quantity: i32::MAX }.validate().is_err());
    }

    #[test]
    fn test_merged_quantity_is_bounded() {
        assert_eq!(merged_quantity(3, 2), Some(5));
        assert_eq!(merged_quantity(MAX_QUANTITY - 1, 1), Some(MAX_QUANTITY));
        assert_eq!(merged_quantity(MAX_QUANTITY, 1), None);
        assert_eq!(merged_quantity(i32::MAX, 1), None);
    }
}
