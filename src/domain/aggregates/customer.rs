//! Customer Aggregate

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::validators::{validate_birth_date, validate_phone_number};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership")]
pub enum Membership {
    #[default]
    #[serde(rename = "B")]
    #[sqlx(rename = "B")]
    Bronze,
    #[serde(rename = "S")]
    #[sqlx(rename = "S")]
    Silver,
    #[serde(rename = "G")]
    #[sqlx(rename = "G")]
    Gold,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: i64,
    /// Account id in the identity service.
    pub user_id: i64,
    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
    pub membership: Membership,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewCustomer {
    pub user_id: i64,
    #[validate(custom = "validate_phone_number")]
    pub phone_number: String,
    #[validate(custom = "validate_birth_date")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub membership: Membership,
}

/// Profile fields a caller may set on their own record.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CustomerProfile {
    #[validate(custom = "validate_phone_number")]
    pub phone_number: String,
    #[validate(custom = "validate_birth_date")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub membership: Membership,
}

impl CustomerProfile {
    pub fn for_user(self, user_id: i64) -> NewCustomer {
        NewCustomer {
            user_id,
            phone_number: self.phone_number,
            birth_date: self.birth_date,
            membership: self.membership,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: i64,
    pub customer_id: i64,
    pub street: String,
    pub city: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewAddress {
    #[validate(length(min = 1, max = 255))]
    pub street: String,
    #[validate(length(min = 1, max = 255))]
    pub city: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_wire_codes() {
        assert_eq!(serde_json::to_string(&Membership::Gold).unwrap(), "\"G\"");
        let parsed: Membership = serde_json::from_str("\"S\"").unwrap();
        assert_eq!(parsed, Membership::Silver);
    }

    #[test]
    fn test_profile_validation() {
        let profile = CustomerProfile {
            phone_number: "12345".into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 17),
            membership: Membership::default(),
        };
        let errors = profile.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone_number"));

        let profile = CustomerProfile { phone_number: "+998901234567".into(), ..profile };
        assert!(profile.validate().is_ok());
        assert_eq!(profile.for_user(42).user_id, 42);
    }
}
