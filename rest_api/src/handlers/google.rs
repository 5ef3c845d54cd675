// rest_api/src/handlers/google.rs
//
// Calendar connection endpoints. `callback` is hit by the OAuth redirect and
// is the only unauthenticated route; `state` carries a signed short-lived
// token through the consent round trip so the credential can only land on
// the account that started the flow.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use calendar::{GoogleCalendarApi, ReconciliationWorker};
use models::{ClinicError, ScheduleType, ValidationError};
use security::Permission;

use crate::auth::Caller;
use crate::envelope::{success, ApiResult};
use crate::AppState;

fn worker(state: &AppState) -> Result<&Arc<ReconciliationWorker>, ClinicError> {
    state
        .worker
        .as_ref()
        .ok_or_else(|| ClinicError::External("calendar integration is not configured".to_string()))
}

fn google(state: &AppState) -> Result<&Arc<GoogleCalendarApi>, ClinicError> {
    state
        .google
        .as_ref()
        .ok_or_else(|| ClinicError::External("calendar integration is not configured".to_string()))
}

/// Hands the browser the Google consent URL for this account.
pub async fn connect(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> ApiResult<impl IntoResponse> {
    ctx.require(Permission::CalendarSync)?;
    let token =
        security::generate_state_token(ctx.user_id, state.config.jwt_secret.as_bytes())?;
    let url = google(&state)?.auth_url(&token);
    Ok(success(json!({ "url": url })))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

/// OAuth redirect target. Exchanges the code and stores the credential for
/// the user named by `state`.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<impl IntoResponse> {
    let user_id =
        security::validate_state_token(&query.state, state.config.jwt_secret.as_bytes())
            .map_err(|_| ClinicError::Validation(ValidationError::InvalidValue("state")))?;
    let token = google(&state)?.exchange_code(&query.code).await?;
    state
        .store
        .upsert_auth_token(
            user_id,
            &token.access_token,
            token.refresh_token.as_deref(),
            token.expires_at(),
            "primary",
        )
        .await?;
    Ok(success(json!({ "connected": true })))
}

pub async fn status(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> ApiResult<impl IntoResponse> {
    ctx.require(Permission::CalendarSync)?;
    Ok(success(
        worker(&state)?.connection_status(ctx.user_id).await?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(rename = "type")]
    pub schedule_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub async fn reconcile(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Json(payload): Json<SyncRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require(Permission::CalendarSync)?;
    let schedule_type: ScheduleType = payload
        .schedule_type
        .as_deref()
        .ok_or(ValidationError::MissingField("type"))?
        .parse()
        .map_err(ClinicError::Validation)?;
    let report = worker(&state)?
        .sync_range(ctx.user_id, schedule_type, payload.start_date, payload.end_date)
        .await?;
    Ok(success(report))
}

pub async fn disconnect(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> ApiResult<impl IntoResponse> {
    ctx.require(Permission::CalendarSync)?;
    worker(&state)?.disconnect(ctx.user_id).await?;
    Ok(success(json!({ "disconnected": true })))
}
