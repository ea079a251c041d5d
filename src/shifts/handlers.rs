use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::services::AuthUser,
    error::ApiError,
    state::AppState,
    store::{Shift, Store},
};

use super::dto::FinishShiftRequest;

pub fn shift_routes() -> Router<AppState> {
    Router::new()
        .route("/shifts/start", post(start_shift))
        .route("/shifts/finish", patch(finish_shift))
        .route("/shifts", get(list_shifts))
}

#[instrument(skip(state))]
pub async fn start_shift(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<(StatusCode, Json<Shift>), ApiError> {
    let shift = state
        .store
        .start_shift(identity.id, OffsetDateTime::now_utc())
        .await?;
    info!(user_id = %identity.id, email = %identity.email, shift_id = %shift.id, "shift started");
    Ok((StatusCode::CREATED, Json(shift)))
}

#[instrument(skip(state, body))]
pub async fn finish_shift(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: Option<Json<FinishShiftRequest>>,
) -> Result<Json<Shift>, ApiError> {
    let report = body.and_then(|Json(b)| b.report).unwrap_or_default();
    let shift = state
        .store
        .finish_shift(identity.id, report, OffsetDateTime::now_utc())
        .await?;
    info!(user_id = %identity.id, shift_id = %shift.id, "shift finished");
    Ok(Json(shift))
}

#[instrument(skip(state))]
pub async fn list_shifts(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Shift>>, ApiError> {
    let shifts = state.store.list_shifts(identity.id).await?;
    Ok(Json(shifts))
}
