// rest_api/src/handlers/schedules.rs

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use models::{
    NewNurseSchedule, NewPatientSchedule, ScheduleFilter, UpdateNurseSchedule,
    UpdatePatientSchedule,
};

use crate::auth::Caller;
use crate::envelope::{success, success_with_meta, ApiResult, Meta};
use crate::AppState;

pub async fn create_patient_schedule(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Json(payload): Json<NewPatientSchedule>,
) -> ApiResult<impl IntoResponse> {
    let schedule = state.schedules.create_patient_schedule(&ctx, &payload).await?;
    Ok((StatusCode::CREATED, success(schedule)))
}

pub async fn list_patient_schedules(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Query(filter): Query<ScheduleFilter>,
) -> ApiResult<impl IntoResponse> {
    let (rows, total) = state.schedules.list_patient_schedules(&ctx, &filter).await?;
    Ok(success_with_meta(
        rows,
        Meta::new(filter.page(), filter.limit(), total),
    ))
}

pub async fn get_patient_schedule(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(state.schedules.get_patient_schedule(&ctx, id).await?))
}

pub async fn update_patient_schedule(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    Json(patch): Json<UpdatePatientSchedule>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(
        state.schedules.update_patient_schedule(&ctx, id, &patch).await?,
    ))
}

pub async fn delete_patient_schedule(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.schedules.delete_patient_schedule(&ctx, id).await?;
    Ok(success(json!({ "deleted": true })))
}

pub async fn create_nurse_schedule(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Json(payload): Json<NewNurseSchedule>,
) -> ApiResult<impl IntoResponse> {
    let schedule = state.schedules.create_nurse_schedule(&ctx, &payload).await?;
    Ok((StatusCode::CREATED, success(schedule)))
}

pub async fn list_nurse_schedules(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Query(filter): Query<ScheduleFilter>,
) -> ApiResult<impl IntoResponse> {
    let (rows, total) = state.schedules.list_nurse_schedules(&ctx, &filter).await?;
    Ok(success_with_meta(
        rows,
        Meta::new(filter.page(), filter.limit(), total),
    ))
}

pub async fn get_nurse_schedule(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(state.schedules.get_nurse_schedule(&ctx, id).await?))
}

pub async fn update_nurse_schedule(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
    Json(patch): Json<UpdateNurseSchedule>,
) -> ApiResult<impl IntoResponse> {
    Ok(success(
        state.schedules.update_nurse_schedule(&ctx, id, &patch).await?,
    ))
}

pub async fn delete_nurse_schedule(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.schedules.delete_nurse_schedule(&ctx, id).await?;
    Ok(success(json!({ "deleted": true })))
}
