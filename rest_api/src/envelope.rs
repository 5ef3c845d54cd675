// rest_api/src/envelope.rs
//
// The uniform response envelope:
// `{success, data?, error?: {code, message, details?}, meta?}`.
// Domain errors map to stable HTTP statuses here and nowhere else.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use models::ClinicError;

/// Pagination block for list responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Meta {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let total_pages = (total + limit as i64 - 1) / limit.max(1) as i64;
        Meta {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

pub fn success<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

pub fn success_with_meta<T: Serialize>(data: T, meta: Meta) -> Json<Value> {
    Json(json!({ "success": true, "data": data, "meta": meta }))
}

/// Newtype so `ClinicError` can cross the axum boundary with `?`.
#[derive(Debug)]
pub struct ApiError(pub ClinicError);

impl<E> From<E> for ApiError
where
    E: Into<ClinicError>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ClinicError::Validation(_) => StatusCode::BAD_REQUEST,
            ClinicError::Unauthorized => StatusCode::UNAUTHORIZED,
            ClinicError::Forbidden(_) => StatusCode::FORBIDDEN,
            ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
            ClinicError::Conflict(_) | ClinicError::InvalidState(_) | ClinicError::NotConnected => {
                StatusCode::CONFLICT
            }
            ClinicError::External(_) => StatusCode::BAD_GATEWAY,
            ClinicError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Storage internals never reach the wire.
        let message = match &self.0 {
            ClinicError::Storage(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        let details = match &self.0 {
            ClinicError::Validation(v) => v.field().map(|field| json!({ "field": field })),
            _ => None,
        };

        let mut error = json!({ "code": self.0.code(), "message": message });
        if let Some(details) = details {
            error["details"] = details;
        }
        let body = Json(json!({ "success": false, "error": error }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::ValidationError;

    fn status_of(err: ClinicError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        let validation = ClinicError::Validation(ValidationError::OutOfRange {
            field: "preWeightG",
            min: 10_000,
            max: 200_000,
            value: 5_000,
        });
        assert_eq!(status_of(validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ClinicError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(ClinicError::Forbidden("nope".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ClinicError::NotFound("session".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ClinicError::Conflict("duplicate booking".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ClinicError::InvalidState("already completed".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ClinicError::External("google 503".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ClinicError::Storage("disk io".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn meta_rounds_total_pages_up() {
        let meta = Meta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);
        let meta = Meta::new(2, 20, 40);
        assert_eq!(meta.total_pages, 2);
    }
}
