// rest_api/src/handlers/sessions.rs

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use models::{
    CompleteSessionRequest, SessionFilter, StartSessionRequest, UpdateSessionRequest,
};

use crate::auth::Caller;
use crate::envelope::{success, success_with_meta, ApiResult, Meta};
use crate::AppState;

pub async fn start_session(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Json(payload): Json<StartSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.lifecycle.start(&ctx, &payload).await?;
    Ok((StatusCode::CREATED, success(session)))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Query(filter): Query<SessionFilter>,
) -> ApiResult<impl IntoResponse> {
    let (rows, total) = state.lifecycle.list(&ctx, &filter).await?;
    Ok(success_with_meta(
        rows,
        Meta::new(filter.page(), filter.limit(), total),
    ))
}

/// Full session view: joined display names plus complication and
/// medication lists.
pub async fn get_session(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(state.lifecycle.get_detail(&ctx, id).await?))
}

pub async fn update_session(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    Json(patch): Json<UpdateSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(state.lifecycle.update(&ctx, id, &patch).await?))
}

pub async fn complete_session(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    Json(payload): Json<CompleteSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(state.lifecycle.complete(&ctx, id, &payload).await?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.lifecycle.delete(&ctx, id).await?;
    Ok(success(json!({ "deleted": true })))
}
