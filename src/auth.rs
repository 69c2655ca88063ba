//! Caller identity and access rules.
//!
//! Authentication happens upstream; the gateway forwards the account id and
//! staff flag as headers. This module only reads them and decides what the
//! caller may do.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::StoreError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const STAFF_HEADER: &str = "x-user-staff";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User { user_id: i64, is_staff: bool },
}

impl Caller {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Self::Anonymous => None,
            Self::User { user_id, .. } => Some(*user_id),
        }
    }

    pub fn is_staff(&self) -> bool { matches!(self, Self::User { is_staff: true, .. }) }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = StoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else { return Ok(Self::Anonymous) };
        let user_id = raw
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or(StoreError::Unauthenticated)?;
        let is_staff = parts
            .headers
            .get(STAFF_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("true") || value == "1");
        Ok(Self::User { user_id, is_staff })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Customer,
    /// The caller's own customer record (`/customers/me/`).
    CustomerProfile,
    CustomerHistory,
    Order,
}

/// Decides whether `caller` may perform `action` on `resource`.
///
/// Anonymous callers get 401 where an identity is needed; identified callers
/// lacking privilege get 403.
pub fn authorize(caller: &Caller, action: Action, resource: Resource) -> Result<(), StoreError> {
    let needs_staff = match (resource, action) {
        (Resource::Order, Action::Update | Action::Delete) => true,
        (Resource::CustomerHistory, _) => true,
        (Resource::Order | Resource::CustomerProfile, _) => false,
        (Resource::Customer, _) => return Ok(()),
    };
    match caller {
        Caller::Anonymous => Err(StoreError::Unauthenticated),
        Caller::User { is_staff, .. } if needs_staff && !is_staff => Err(StoreError::Forbidden),
        Caller::User { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    const ALICE: Caller = Caller::User { user_id: 1, is_staff: false };
    const ADMIN: Caller = Caller::User { user_id: 2, is_staff: true };

    async fn caller_from(headers: &[(&str, &str)]) -> Result<Caller, StoreError> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_caller_from_headers() {
        assert_eq!(caller_from(&[]).await.unwrap(), Caller::Anonymous);
        assert_eq!(caller_from(&[(USER_ID_HEADER, "7")]).await.unwrap(), Caller::User { user_id: 7, is_staff: false });
        assert_eq!(
            caller_from(&[(USER_ID_HEADER, "7"), (STAFF_HEADER, "true")]).await.unwrap(),
            Caller::User { user_id: 7, is_staff: true }
        );
        assert!(matches!(caller_from(&[(USER_ID_HEADER, "abc")]).await, Err(StoreError::Unauthenticated)));
    }

    #[test]
    fn test_customer_records_are_open() {
        assert!(authorize(&Caller::Anonymous, Action::Create, Resource::Customer).is_ok());
        assert!(authorize(&Caller::Anonymous, Action::Delete, Resource::Customer).is_ok());
    }

    #[test]
    fn test_order_rules() {
        assert!(matches!(authorize(&Caller::Anonymous, Action::List, Resource::Order), Err(StoreError::Unauthenticated)));
        assert!(authorize(&ALICE, Action::Create, Resource::Order).is_ok());
        assert!(matches!(authorize(&ALICE, Action::Update, Resource::Order), Err(StoreError::Forbidden)));
        assert!(authorize(&ADMIN, Action::Delete, Resource::Order).is_ok());
    }

    #[test]
    fn test_customer_rules() {
        assert!(authorize(&ALICE, Action::Update, Resource::CustomerProfile).is_ok());
        assert!(matches!(
            authorize(&Caller::Anonymous, Action::Retrieve, Resource::CustomerProfile),
            Err(StoreError::Unauthenticated)
        ));
        assert!(matches!(authorize(&ALICE, Action::Retrieve, Resource::CustomerHistory), Err(StoreError::Forbidden)));
        assert!(authorize(&ADMIN, Action::Retrieve, Resource::CustomerHistory).is_ok());
    }
}
