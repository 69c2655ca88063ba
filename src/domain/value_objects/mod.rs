//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Multiplier applied to a unit price to display it with tax (1.12).
pub const TAX_RATE: Decimal = Decimal::from_parts(112, 0, 0, false, 2);

/// Slug value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Slug(String);

impl Slug {
    pub const MAX_LEN: usize = 50;

    pub fn new(value: impl Into<String>) -> Result<Self, SlugError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(SlugError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(SlugError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(SlugError::InvalidCharacter);
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SlugError { Empty, TooLong, InvalidCharacter }
impl std::error::Error for SlugError {}
impl fmt::Display for SlugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Slug must not be empty"),
            Self::TooLong => write!(f, "Slug must be at most {} characters", Slug::MAX_LEN),
            Self::InvalidCharacter => write!(f, "Slug may only contain letters, numbers, underscores or hyphens"),
        }
    }
}

/// Unit price of a product. Stored with two decimal places, between 1 and 9999.99.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const MIN: Decimal = Decimal::ONE;
    pub const MAX: Decimal = Decimal::from_parts(999_999, 0, 0, false, 2);

    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount < Self::MIN { return Err(PriceError::BelowMinimum); }
        if amount > Self::MAX { return Err(PriceError::TooLarge); }
        if amount.round_dp(2) != amount { return Err(PriceError::TooPrecise); }
        let mut amount = amount;
        amount.rescale(2);
        Ok(Self(amount))
    }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn with_tax(&self) -> Decimal { (self.0 * TAX_RATE).round_dp(2) }
    pub fn times(&self, qty: i32) -> Decimal { self.0 * Decimal::from(qty) }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PriceError { BelowMinimum, TooLarge, TooPrecise }
impl std::error::Error for PriceError {}
impl fmt::Display for PriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowMinimum => write!(f, "Ensure this value is greater than or equal to {}", Price::MIN),
            Self::TooLarge => write!(f, "Ensure there are no more than 6 digits in total"),
            Self::TooPrecise => write!(f, "Ensure there are no more than 2 decimal places"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_slug() {
        assert_eq!(Slug::new(" summer-hat_2 ").unwrap().as_str(), "summer-hat_2");
        assert_eq!(Slug::new("two words"), Err(SlugError::InvalidCharacter));
        assert_eq!(Slug::new(""), Err(SlugError::Empty));
    }

    #[test]
    fn test_price_bounds() {
        assert_eq!(Price::new(dec!(0.99)), Err(PriceError::BelowMinimum));
        assert_eq!(Price::new(dec!(10000)), Err(PriceError::TooLarge));
        assert_eq!(Price::new(dec!(1.005)), Err(PriceError::TooPrecise));
        assert_eq!(Price::new(dec!(10)).unwrap().amount().to_string(), "10.00");
    }

    #[test]
    fn test_price_with_tax() {
        assert_eq!(Price::new(dec!(10)).unwrap().with_tax(), dec!(11.20));
        assert_eq!(Price::new(dec!(19.99)).unwrap().with_tax(), dec!(22.39));
        assert_eq!(Price::new(dec!(2.50)).unwrap().times(3), dec!(7.50));
    }
}
