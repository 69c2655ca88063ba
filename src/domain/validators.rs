//! Field validators used by the `Validate` derives on incoming payloads.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::domain::value_objects::{Price, Slug};

/// Customers must be at least this many years old.
pub const MINIMUM_AGE: i32 = 18;

static PHONE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+998[93][0134579]\d{7}$").expect("phone number pattern is valid")
});

fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Accepts Uzbek mobile numbers in international form, e.g. `+998901234567`.
pub fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    if PHONE_NUMBER.is_match(value) {
        Ok(())
    } else {
        Err(invalid("phone_number", "Invalid phone number format"))
    }
}

pub fn validate_birth_date(value: &NaiveDate) -> Result<(), ValidationError> {
    check_minimum_age(*value, Utc::now().date_naive())
}

/// Age as the difference of calendar years. Whether the birthday has
/// already passed this year is not taken into account.
pub fn age_in_years(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    today.year() - birth_date.year()
}

pub fn check_minimum_age(birth_date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if age_in_years(birth_date, today) < MINIMUM_AGE {
        return Err(invalid("birth_date", format!("Customer must be at least {MINIMUM_AGE} years old")));
    }
    Ok(())
}

pub fn validate_unit_price(value: &Decimal) -> Result<(), ValidationError> {
    Price::new(*value).map(|_| ()).map_err(|e| invalid("price", e.to_string()))
}

pub fn validate_slug(value: &str) -> Result<(), ValidationError> {
    Slug::new(value).map(|_| ()).map_err(|e| invalid("slug", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_phone_number() {
        assert!(validate_phone_number("+998901234567").is_ok());
        assert!(validate_phone_number("+998331234567").is_ok());
        assert!(validate_phone_number("+998921234567").is_err());
        assert!(validate_phone_number("998901234567").is_err());
        assert!(validate_phone_number("+99890123456").is_err());
        assert!(validate_phone_number("call +998901234567").is_err());
        assert!(validate_phone_number("not a phone").is_err());
    }

    #[test]
    fn test_minimum_age() {
        let today = date(2024, 6, 1);
        assert!(check_minimum_age(date(2000, 1, 1), today).is_ok());
        assert!(check_minimum_age(date(2010, 1, 1), today).is_err());
        let err = check_minimum_age(date(2007, 1, 1), today).unwrap_err();
        assert_eq!(err.code, "birth_date");
    }

    #[test]
    fn test_age_counts_calendar_years_only() {
        // Birthday later in the year still counts as 18.
        assert_eq!(age_in_years(date(2006, 12, 31), date(2024, 1, 1)), 18);
        assert!(check_minimum_age(date(2006, 12, 31), date(2024, 1, 1)).is_ok());
    }

    #[test]
    fn test_unit_price_and_slug() {
        assert!(validate_unit_price(&dec!(1)).is_ok());
        assert!(validate_unit_price(&dec!(0.50)).is_err());
        assert!(validate_slug("blue-shirt").is_ok());
        assert!(validate_slug("blue shirt").is_err());
    }
}
