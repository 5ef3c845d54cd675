// rest_api/src/auth.rs
//
// Bearer-token auth. The extractor validates the JWT, resolves the caller's
// role, permissions and linked clinical profiles, and hands every handler a
// ready `CallerContext`. Missing or bad credentials stop here with 401.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use models::ClinicError;
use security::{CallerContext, Role};

use crate::envelope::ApiError;
use crate::AppState;

/// The authenticated caller, one per request.
pub struct Caller(pub CallerContext);

pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").map(str::trim)
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ClinicError::Unauthorized)?;
        let token = bearer_token(header).ok_or(ClinicError::Unauthorized)?;

        let claims = security::validate_token(token, state.config.jwt_secret.as_bytes())?;
        let role = Role::from_id(claims.role_id).ok_or(ClinicError::Unauthorized)?;

        let patient_id = state.store.patient_id_for_user(claims.user_id).await?;
        let nurse_id = state.store.nurse_id_for_user(claims.user_id).await?;

        let ctx = CallerContext::new(claims.user_id, role, &state.roles)
            .with_patient(patient_id)
            .with_nurse(nurse_id);
        Ok(Caller(ctx))
    }
}
