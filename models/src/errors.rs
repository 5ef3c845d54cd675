// models/src/errors.rs

pub use thiserror::Error;

/// Error taxonomy shared by every clinic subsystem.
///
/// Each variant maps to a stable wire code (see `ClinicError::code`) so the
/// HTTP layer can surface structured errors without leaking internals.
#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Authentication required")]
    Unauthorized,
    #[error("Access denied: {0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String), // Duplicate booking, double session start
    #[error("Invalid state: {0}")]
    InvalidState(String), // State-machine violation (e.g. completing twice)
    #[error("Calendar is not connected for this account")]
    NotConnected,
    #[error("External service error: {0}")]
    External(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClinicError {
    /// Stable machine-readable code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ClinicError::Validation(_) => "VALIDATION_ERROR",
            ClinicError::Unauthorized => "UNAUTHORIZED",
            ClinicError::Forbidden(_) => "FORBIDDEN",
            ClinicError::NotFound(_) => "NOT_FOUND",
            ClinicError::Conflict(_) => "CONFLICT",
            ClinicError::InvalidState(_) => "INVALID_STATE",
            ClinicError::NotConnected => "NOT_CONNECTED",
            ClinicError::External(_) => "EXTERNAL_SERVICE_ERROR",
            ClinicError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<sqlx::Error> for ClinicError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ClinicError::NotFound("record".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ClinicError::Conflict("a record with the same key already exists".to_string())
            }
            _ => ClinicError::Storage(err.to_string()),
        }
    }
}

/// A field-level validation error, recoverable by the caller resubmitting.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A numeric clinical value fell outside its accepted range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
    /// A required field was missing from the request.
    #[error("missing required field {0}")]
    MissingField(&'static str),
    /// A field was present but its value could not be used.
    #[error("invalid value for {0}")]
    InvalidValue(&'static str),
    /// A status string did not name a known state.
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
    /// A date or time string could not be parsed.
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),
    /// An end boundary preceded its start.
    #[error("{0} must not precede the range start")]
    InvertedRange(&'static str),
}

impl ValidationError {
    /// Field name for the `details` map in the error envelope, when one applies.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::OutOfRange { field, .. } => Some(field),
            ValidationError::MissingField(field) => Some(field),
            ValidationError::InvalidValue(field) => Some(field),
            _ => None,
        }
    }
}

/// A type alias for a `Result` that returns a `ClinicError` on failure.
pub type ClinicResult<T> = Result<T, ClinicError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;
