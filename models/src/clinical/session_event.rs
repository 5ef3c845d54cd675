// models/src/clinical/session_event.rs
//
// Child records of an HD session. Both kinds are append-only; setting a
// complication's `resolved_at` is the only supported mutation. Corrections
// are modeled as superseding entries plus a note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An intradialytic complication observed during a session.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HdSessionComplication {
    pub id: i64,
    pub hd_session_id: i64,
    pub complication_id: i64,
    pub occurred_at: DateTime<Utc>,
    pub action_taken: Option<String>,
    pub notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Display name joined from the complication reference table.
    #[sqlx(default)]
    pub complication_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComplication {
    pub complication_id: i64,
    /// Defaults to the current instant.
    pub occurred_at: Option<DateTime<Utc>>,
    pub action_taken: Option<String>,
    pub notes: Option<String>,
}

/// A medication administered during a session.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HdSessionMedication {
    pub id: i64,
    pub hd_session_id: i64,
    pub medication_id: i64,
    pub dosage: String,
    pub route: String,
    pub administered_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Display name joined from the medication reference table.
    #[sqlx(default)]
    pub medication_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedication {
    pub medication_id: i64,
    pub dosage: String,
    pub route: String,
    /// Defaults to the current instant.
    pub administered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}
