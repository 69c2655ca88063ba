//! Collection Aggregate

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collection {
    pub id: i64,
    pub title: String,
    pub featured_product_id: Option<i64>,
    pub products_count: i64,
}

impl Collection {
    /// Only empty collections may be deleted.
    pub fn is_empty(&self) -> bool { self.products_count == 0 }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewCollection {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub featured_product: Option<i64>,
}
