use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::entities::rating;
use crate::error::AppResult;
use crate::services::rating::{self as ratings, RatingContext, RatingInput};
use crate::AppState;

/// What the rating page needs: trip summary and whether it can still be rated
pub async fn get_rating_context(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> AppResult<Json<RatingContext>> {
    Ok(Json(ratings::rating_context(&state.db, reservation_id).await?))
}

pub async fn submit_rating(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<RatingInput>,
) -> AppResult<Json<rating::Model>> {
    Ok(Json(
        ratings::submit_rating(&state.db, reservation_id, payload).await?,
    ))
}
