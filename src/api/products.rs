//! Product handlers, with the reviews and images nested under a product.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use super::dto::{list, ProductDto, ProductImageDto, ReviewDto};
use super::extract::{JsonBody, ValidatedJson};
use super::AppState;
use crate::domain::aggregates::{NewProduct, NewProductImage, NewReview, ProductFilter, ProductPatch};
use crate::repository::{ProductRepository, ReviewRepository};
use crate::{Result, StoreError};

async fn require_product(state: &AppState, id: i64) -> Result<()> {
    match state.store.get_product(id).await? {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound("product")),
    }
}

pub async fn list_products(State(s): State<AppState>, Query(filter): Query<ProductFilter>) -> Result<Json<Vec<ProductDto>>> {
    Ok(Json(list(s.store.list_products(filter).await?)))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<ProductDto>> {
    let product = s.store.get_product(id).await?.ok_or(StoreError::NotFound("product"))?;
    Ok(Json(product.into()))
}

pub async fn create_product(
    State(s): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewProduct>,
) -> Result<(StatusCode, Json<ProductDto>)> {
    let product = s.store.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

pub async fn update_product(
    State(s): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(input): ValidatedJson<NewProduct>,
) -> Result<Json<ProductDto>> {
    Ok(Json(s.store.update_product(id, input).await?.into()))
}

pub async fn patch_product(
    State(s): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(patch): JsonBody<ProductPatch>,
) -> Result<Json<ProductDto>> {
    let current = s.store.get_product(id).await?.ok_or(StoreError::NotFound("product"))?;
    let input = patch.apply(&current);
    input.validate()?;
    Ok(Json(s.store.update_product(id, input).await?.into()))
}

pub async fn delete_product(State(s): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    s.store.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_reviews(State(s): State<AppState>, Path(product_id): Path<i64>) -> Result<Json<Vec<ReviewDto>>> {
    require_product(&s, product_id).await?;
    Ok(Json(list(s.store.list_reviews(product_id).await?)))
}

pub async fn get_review(State(s): State<AppState>, Path((product_id, id)): Path<(i64, i64)>) -> Result<Json<ReviewDto>> {
    require_product(&s, product_id).await?;
    let review = s.store.get_review(product_id, id).await?.ok_or(StoreError::NotFound("review"))?;
    Ok(Json(review.into()))
}

pub async fn create_review(
    State(s): State<AppState>,
    Path(product_id): Path<i64>,
    ValidatedJson(input): ValidatedJson<NewReview>,
) -> Result<(StatusCode, Json<ReviewDto>)> {
    let review = s.store.create_review(product_id, input).await?;
    Ok((StatusCode::CREATED, Json(review.into())))
}

pub async fn update_review(
    State(s): State<AppState>,
    Path((product_id, id)): Path<(i64, i64)>,
    ValidatedJson(input): ValidatedJson<NewReview>,
) -> Result<Json<ReviewDto>> {
    require_product(&s, product_id).await?;
    Ok(Json(s.store.update_review(product_id, id, input).await?.into()))
}

pub async fn delete_review(State(s): State<AppState>, Path((product_id, id)): Path<(i64, i64)>) -> Result<StatusCode> {
    require_product(&s, product_id).await?;
    s.store.delete_review(product_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_images(State(s): State<AppState>, Path(product_id): Path<i64>) -> Result<Json<Vec<ProductImageDto>>> {
    require_product(&s, product_id).await?;
    Ok(Json(list(s.store.list_images(product_id).await?)))
}

pub async fn get_image(State(s): State<AppState>, Path((product_id, id)): Path<(i64, i64)>) -> Result<Json<ProductImageDto>> {
    require_product(&s, product_id).await?;
    let image = s.store.get_image(product_id, id).await?.ok_or(StoreError::NotFound("image"))?;
    Ok(Json(image.into()))
}

pub async fn add_image(
    State(s): State<AppState>,
    Path(product_id): Path<i64>,
    ValidatedJson(input): ValidatedJson<NewProductImage>,
) -> Result<(StatusCode, Json<ProductImageDto>)> {
    let image = s.store.add_image(product_id, input).await?;
    Ok((StatusCode::CREATED, Json(image.into())))
}

pub async fn delete_image(State(s): State<AppState>, Path((product_id, id)): Path<(i64, i64)>) -> Result<StatusCode> {
    require_product(&s, product_id).await?;
    s.store.delete_image(product_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
