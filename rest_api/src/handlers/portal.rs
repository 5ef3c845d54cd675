// rest_api/src/handlers/portal.rs
//
// Patient-portal read views. The same lifecycle service backs them; patient
// callers are row-scoped by `CallerContext`, so these are plain reads.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use models::SessionFilter;

use crate::auth::Caller;
use crate::envelope::{success, success_with_meta, ApiResult, Meta};
use crate::AppState;

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

pub async fn get_session(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(state.lifecycle.get_detail(&ctx, id).await?))
}
