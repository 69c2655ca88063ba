//! Order handlers. Access rules and scoping live in [`crate::ordering`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{list, OrderDto};
use super::extract::ValidatedJson;
use super::AppState;
use crate::auth::Caller;
use crate::domain::aggregates::{OrderChanges, PlaceOrder};
use crate::Result;

pub async fn list_orders(State(s): State<AppState>, caller: Caller) -> Result<Json<Vec<OrderDto>>> {
    Ok(Json(list(s.orders.list_orders(&caller).await?)))
}

pub async fn get_order(State(s): State<AppState>, caller: Caller, Path(id): Path<i64>) -> Result<Json<OrderDto>> {
    Ok(Json(s.orders.get_order(&caller, id).await?.into()))
}

pub async fn create_order(
    State(s): State<AppState>,
    caller: Caller,
    ValidatedJson(input): ValidatedJson<PlaceOrder>,
) -> Result<(StatusCode, Json<OrderDto>)> {
    let order = s.orders.place_order(&caller, input.cart_id).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

pub async fn update_order(
    State(s): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    ValidatedJson(changes): ValidatedJson<OrderChanges>,
) -> Result<Json<OrderDto>> {
    Ok(Json(s.orders.update_payment_status(&caller, id, changes.payment_status).await?.into()))
}

pub async fn delete_order(State(s): State<AppState>, caller: Caller, Path(id): Path<i64>) -> Result<StatusCode> {
    s.orders.delete_order(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
