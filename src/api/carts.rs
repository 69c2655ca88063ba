//! Cart handlers. Carts are anonymous; the UUID in the path is the only key.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use super::dto::{list, CartDto, CartItemDto};
use super::extract::ValidatedJson;
use super::AppState;
use crate::domain::aggregates::{CartItemChanges, NewCartItem};
use crate::repository::CartRepository;
use crate::{Result, StoreError};

pub async fn create_cart(State(s): State<AppState>) -> Result<(StatusCode, Json<CartDto>)> {
    let cart = s.store.create_cart().await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

pub async fn get_cart(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<CartDto>> {
    let cart = s.store.get_cart(id).await?.ok_or(StoreError::NotFound("cart"))?;
    Ok(Json(cart.into()))
}

pub async fn delete_cart(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.store.delete_cart(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_items(State(s): State<AppState>, Path(cart_id): Path<Uuid>) -> Result<Json<Vec<CartItemDto>>> {
    let cart = s.store.get_cart(cart_id).await?.ok_or(StoreError::NotFound("cart"))?;
    Ok(Json(list(cart.items)))
}

pub async fn get_item(State(s): State<AppState>, Path((cart_id, id)): Path<(Uuid, i64)>) -> Result<Json<CartItemDto>> {
    let item = s.store.get_cart_item(cart_id, id).await?.ok_or(StoreError::NotFound("cart item"))?;
    Ok(Json(item.into()))
}

pub async fn add_item(
    State(s): State<AppState>,
    Path(cart_id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<NewCartItem>,
) -> Result<(StatusCode, Json<CartItemDto>)> {
    let item = s.store.add_cart_item(cart_id, input).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

pub async fn update_item(
    State(s): State<AppState>,
    Path((cart_id, id)): Path<(Uuid, i64)>,
    ValidatedJson(changes): ValidatedJson<CartItemChanges>,
) -> Result<Json<CartItemDto>> {
    Ok(Json(s.store.set_cart_item_quantity(cart_id, id, changes.quantity).await?.into()))
}

pub async fn delete_item(State(s): State<AppState>, Path((cart_id, id)): Path<(Uuid, i64)>) -> Result<StatusCode> {
    s.store.delete_cart_item(cart_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
