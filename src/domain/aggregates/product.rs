//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::domain::validators::{validate_slug, validate_unit_price};
use crate::domain::value_objects::{Price, Slug};

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub unit_price: Price,
    pub inventory: i32,
    pub last_update: DateTime<Utc>,
    pub collection_id: i64,
    pub promotion_ids: Vec<i64>,
}

impl Product {
    pub fn price_with_tax(&self) -> Decimal { self.unit_price.with_tax() }
    pub fn summary(&self) -> ProductSummary {
        ProductSummary { id: self.id, title: self.title.clone(), unit_price: self.unit_price }
    }
}

/// The short form of a product embedded in cart and order lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: i64,
    pub title: String,
    pub unit_price: Price,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(custom = "validate_slug")]
    pub slug: String,
    pub description: Option<String>,
    #[validate(custom = "validate_unit_price")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub inventory: i32,
    pub collection: i64,
    #[serde(default)]
    pub promotions: Vec<i64>,
}

/// Partial update: absent fields keep their current value.
/// `"description": null` clears the description.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub inventory: Option<i32>,
    pub collection: Option<i64>,
    pub promotions: Option<Vec<i64>>,
}

impl ProductPatch {
    pub fn apply(self, current: &Product) -> NewProduct {
        NewProduct {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            slug: self.slug.unwrap_or_else(|| current.slug.to_string()),
            description: self.description.unwrap_or_else(|| current.description.clone()),
            price: self.price.unwrap_or_else(|| current.unit_price.amount()),
            inventory: self.inventory.unwrap_or(current.inventory),
            collection: self.collection.unwrap_or(current.collection_id),
            promotions: self.promotions.unwrap_or_else(|| current.promotion_ids.clone()),
        }
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub collection_id: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    pub image: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewProductImage {
    #[validate(length(min = 1, max = 255))]
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product() -> Product {
        Product {
            id: 7,
            title: "Tea Pot".into(),
            slug: Slug::new("tea-pot").unwrap(),
            description: None,
            unit_price: Price::new(dec!(25)).unwrap(),
            inventory: 3,
            last_update: Utc::now(),
            collection_id: 1,
            promotion_ids: vec![2],
        }
    }

    #[test]
    fn test_price_with_tax() {
        assert_eq!(product().price_with_tax(), dec!(28.00));
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let patch = ProductPatch { price: Some(dec!(30)), ..Default::default() };
        let merged = patch.apply(&product());
        assert_eq!(merged.title, "Tea Pot");
        assert_eq!(merged.slug, "tea-pot");
        assert_eq!(merged.price, dec!(30));
        assert_eq!(merged.promotions, vec![2]);
    }

    #[test]
    fn test_patch_null_clears_description() {
        let mut current = product();
        current.description = Some("Cast iron".into());

        let patch: ProductPatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(patch.apply(&current).description, None);

        let patch: ProductPatch = serde_json::from_str(r#"{"title": "Kettle"}"#).unwrap();
        assert_eq!(patch.apply(&current).description.as_deref(), Some("Cast iron"));
    }

    #[test]
    fn test_new_product_validation() {
        let input = NewProduct {
            title: String::new(),
            slug: "bad slug".into(),
            description: None,
            price: dec!(0.5),
            inventory: -1,
            collection: 1,
            promotions: vec![],
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["title", "slug", "price", "inventory"] {
            assert!(fields.contains_key(field), "missing error for {field}");
        }
    }
}
