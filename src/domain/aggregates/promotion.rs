//! Promotions

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Promotion {
    pub id: i64,
    pub description: String,
    pub discount: f64,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewPromotion {
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    /// Percent off.
    #[validate(range(min = 0.0, max = 100.0))]
    pub discount: f64,
}
