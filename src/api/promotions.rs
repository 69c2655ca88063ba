use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{list, PromotionDto};
use super::extract::ValidatedJson;
use super::AppState;
use crate::domain::aggregates::NewPromotion;
use crate::repository::PromotionRepository;
use crate::{Result, StoreError};

pub async fn list_promotions(State(s): State<AppState>) -> Result<Json<Vec<PromotionDto>>> {
    Ok(Json(list(s.store.list_promotions().await?)))
}

pub async fn get_promotion(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<PromotionDto>> {
    let promotion = s.store.get_promotion(id).await?.ok_or(StoreError::NotFound("promotion"))?;
    Ok(Json(promotion.into()))
}

pub async fn create_promotion(
    State(s): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewPromotion>,
) -> Result<(StatusCode, Json<PromotionDto>)> {
    let promotion = s.store.create_promotion(input).await?;
    Ok((StatusCode::CREATED, Json(promotion.into())))
}

pub async fn delete_promotion(State(s): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    s.store.delete_promotion(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
