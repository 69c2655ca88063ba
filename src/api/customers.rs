//! Customer handlers, including the caller's own profile, order history
//! and addresses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{list, AddressDto, CustomerDto, OrderDto};
use super::extract::ValidatedJson;
use super::AppState;
use crate::auth::{authorize, Action, Caller, Resource};
use crate::domain::aggregates::{CustomerProfile, NewAddress, NewCustomer};
use crate::repository::CustomerRepository;
use crate::{Result, StoreError};

pub async fn list_customers(State(s): State<AppState>, caller: Caller) -> Result<Json<Vec<CustomerDto>>> {
    authorize(&caller, Action::List, Resource::Customer)?;
    Ok(Json(list(s.store.list_customers().await?)))
}

pub async fn get_customer(State(s): State<AppState>, caller: Caller, Path(id): Path<i64>) -> Result<Json<CustomerDto>> {
    authorize(&caller, Action::Retrieve, Resource::Customer)?;
    let customer = s.store.get_customer(id).await?.ok_or(StoreError::NotFound("customer"))?;
    Ok(Json(customer.into()))
}

pub async fn create_customer(
    State(s): State<AppState>,
    caller: Caller,
    ValidatedJson(input): ValidatedJson<NewCustomer>,
) -> Result<(StatusCode, Json<CustomerDto>)> {
    authorize(&caller, Action::Create, Resource::Customer)?;
    let customer = s.store.create_customer(input).await?;
    Ok((StatusCode::CREATED, Json(customer.into())))
}

pub async fn update_customer(
    State(s): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    ValidatedJson(input): ValidatedJson<NewCustomer>,
) -> Result<Json<CustomerDto>> {
    authorize(&caller, Action::Update, Resource::Customer)?;
    Ok(Json(s.store.update_customer(id, input).await?.into()))
}

pub async fn delete_customer(State(s): State<AppState>, caller: Caller, Path(id): Path<i64>) -> Result<StatusCode> {
    authorize(&caller, Action::Delete, Resource::Customer)?;
    s.store.delete_customer(id).await?;
    tracing::info!(customer_id = id, "Deleted customer");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_me(State(s): State<AppState>, caller: Caller) -> Result<Json<CustomerDto>> {
    authorize(&caller, Action::Retrieve, Resource::CustomerProfile)?;
    let user_id = caller.user_id().ok_or(StoreError::Unauthenticated)?;
    let customer = s.store.get_customer_by_user(user_id).await?.ok_or(StoreError::NotFound("customer"))?;
    Ok(Json(customer.into()))
}

/// Creates the caller's profile on first use, updates it afterwards.
pub async fn update_me(
    State(s): State<AppState>,
    caller: Caller,
    ValidatedJson(profile): ValidatedJson<CustomerProfile>,
) -> Result<(StatusCode, Json<CustomerDto>)> {
    authorize(&caller, Action::Update, Resource::CustomerProfile)?;
    let user_id = caller.user_id().ok_or(StoreError::Unauthenticated)?;
    match s.store.get_customer_by_user(user_id).await? {
        Some(existing) => {
            let customer = s.store.update_customer(existing.id, profile.for_user(user_id)).await?;
            Ok((StatusCode::OK, Json(customer.into())))
        }
        None => {
            let customer = s.store.create_customer(profile.for_user(user_id)).await?;
            Ok((StatusCode::CREATED, Json(customer.into())))
        }
    }
}

pub async fn history(State(s): State<AppState>, caller: Caller, Path(id): Path<i64>) -> Result<Json<Vec<OrderDto>>> {
    Ok(Json(list(s.orders.customer_history(&caller, id).await?)))
}

pub async fn list_addresses(State(s): State<AppState>, caller: Caller, Path(id): Path<i64>) -> Result<Json<Vec<AddressDto>>> {
    authorize(&caller, Action::List, Resource::Customer)?;
    Ok(Json(list(s.store.list_addresses(id).await?)))
}

pub async fn add_address(
    State(s): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    ValidatedJson(input): ValidatedJson<NewAddress>,
) -> Result<(StatusCode, Json<AddressDto>)> {
    authorize(&caller, Action::Create, Resource::Customer)?;
    let address = s.store.add_address(id, input).await?;
    Ok((StatusCode::CREATED, Json(address.into())))
}

pub async fn delete_address(
    State(s): State<AppState>,
    caller: Caller,
    Path((id, address_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    authorize(&caller, Action::Delete, Resource::Customer)?;
    s.store.delete_address(id, address_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
