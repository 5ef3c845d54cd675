// rest_api/src/handlers/events.rs

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use models::{NewComplication, NewMedication};

use crate::auth::Caller;
use crate::envelope::{success, ApiResult};
use crate::AppState;

pub async fn list_complications(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(session_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(
        state.events.list_complications(&ctx, session_id).await?,
    ))
}

pub async fn add_complication(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(session_id): Path<i64>,
    Json(payload): Json<NewComplication>,
) -> ApiResult<impl IntoResponse> {
    let event = state
        .events
        .add_complication(&ctx, session_id, &payload)
        .await?;
    Ok((StatusCode::CREATED, success(event)))
}

pub async fn resolve_complication(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path((session_id, complication_id)): Path<(i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(
        state
            .events
            .resolve_complication(&ctx, session_id, complication_id)
            .await?,
    ))
}

pub async fn list_medications(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(session_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(
        state.events.list_medications(&ctx, session_id).await?,
    ))
}

pub async fn add_medication(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(session_id): Path<i64>,
    Json(payload): Json<NewMedication>,
) -> ApiResult<impl IntoResponse> {
    let event = state
        .events
        .add_medication(&ctx, session_id, &payload)
        .await?;
    Ok((StatusCode::CREATED, success(event)))
}
