//! Storefront
//!
//! Catalog, carts, customer profiles and order placement behind a JSON API.
//!
//! ## Features
//! - Product catalog with collections, promotions, images and reviews
//! - Anonymous carts keyed by an opaque UUID token
//! - Customer profiles with phone number and minimum age checks
//! - Transactional cart-to-order conversion with post-commit listeners
//!
//! Storage is behind the [`repository::Store`] trait, implemented for
//! PostgreSQL and for an in-memory store used in development and tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod notify;
pub mod ordering;
pub mod repository;

use std::borrow::Cow;

use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::domain::aggregates::OrderError;
use crate::domain::value_objects::{PriceError, SlugError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Deletion refused because dependent rows still exist.
    #[error("{0}")]
    Protected(String),

    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// A validation failure attached to a single input field.
    pub fn field(field: &'static str, code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        let mut error = ValidationError::new(code);
        error.message = Some(message.into());
        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        Self::Validation(errors)
    }
}

impl From<PriceError> for StoreError {
    fn from(err: PriceError) -> Self { Self::field("price", "price", err.to_string()) }
}

impl From<SlugError> for StoreError {
    fn from(err: SlugError) -> Self { Self::field("slug", "slug", err.to_string()) }
}

impl From<OrderError> for StoreError {
    fn from(err: OrderError) -> Self { Self::field("payment_status", "settled", err.to_string()) }
}

pub type Result<T> = std::result::Result<T, StoreError>;
