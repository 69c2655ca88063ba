use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{list, CollectionDto};
use super::extract::ValidatedJson;
use super::AppState;
use crate::domain::aggregates::NewCollection;
use crate::repository::CollectionRepository;
use crate::{Result, StoreError};

pub async fn list_collections(State(s): State<AppState>) -> Result<Json<Vec<CollectionDto>>> {
    Ok(Json(list(s.store.list_collections().await?)))
}

pub async fn get_collection(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<CollectionDto>> {
    let collection = s.store.get_collection(id).await?.ok_or(StoreError::NotFound("collection"))?;
    Ok(Json(collection.into()))
}

pub async fn create_collection(
    State(s): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewCollection>,
) -> Result<(StatusCode, Json<CollectionDto>)> {
    let collection = s.store.create_collection(input).await?;
    Ok((StatusCode::CREATED, Json(collection.into())))
}

pub async fn update_collection(
    State(s): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(input): ValidatedJson<NewCollection>,
) -> Result<Json<CollectionDto>> {
    Ok(Json(s.store.update_collection(id, input).await?.into()))
}

pub async fn delete_collection(State(s): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    s.store.delete_collection(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
