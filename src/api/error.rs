//! Maps [`StoreError`] onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use validator::ValidationErrors;

use crate::StoreError;

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Protected(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn field_messages(errors: &ValidationErrors) -> Value {
    let fields: Map<String, Value> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                .collect::<Vec<_>>();
            (field.to_string(), json!(messages))
        })
        .collect();
    Value::Object(fields)
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(errors) => json!({"error": "validation failed", "fields": field_messages(errors)}),
            Self::Database(e) => {
                tracing::error!(error = %e, "Database error");
                json!({"error": "internal server error"})
            }
            Self::Internal(message) => {
                tracing::error!(%message, "Internal error");
                json!({"error": "internal server error"})
            }
            other => json!({"error": other.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreError::NotFound("product").status(), StatusCode::NOT_FOUND);
        assert_eq!(StoreError::Protected("busy".into()).status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(StoreError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(StoreError::field("cart_id", "empty", "The cart is empty.").status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_field_messages() {
        let StoreError::Validation(errors) = StoreError::field("product_id", "does_not_exist", "No product") else {
            unreachable!()
        };
        assert_eq!(field_messages(&errors), json!({"product_id": ["No product"]}));
    }
}
