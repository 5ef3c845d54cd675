// models/src/calendar.rs
//
// Rows backing external calendar reconciliation. The mapping's composite
// key (user, schedule type, schedule id) is what keeps pushes idempotent:
// a schedule can change date or shift and still reconcile to the same
// external event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Which schedule table a mapping row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ScheduleType {
    Nurse,
    Patient,
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleType::Nurse => write!(f, "nurse"),
            ScheduleType::Patient => write!(f, "patient"),
        }
    }
}

impl FromStr for ScheduleType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nurse" => Ok(ScheduleType::Nurse),
            "patient" => Ok(ScheduleType::Patient),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Join row between an internal schedule and its external calendar event.
/// Unique on (user_id, schedule_type, schedule_id).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSyncMapping {
    pub id: i64,
    pub user_id: i64,
    pub schedule_type: ScheduleType,
    pub schedule_id: i64,
    pub external_event_id: String,
    pub last_synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Per-user external OAuth credential. One row per user; upserted on
/// (re)connect, deleted on disconnect.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CalendarAuthToken {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub calendar_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate result of one reconciliation batch.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub synced: u32,
    pub errors: u32,
}
