// models/src/clinical/nurse_schedule.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Attendance state of a nurse booking. Independent of the patient schedule
/// lifecycle; consumed by calendar reconciliation the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NurseScheduleStatus {
    Scheduled,
    Present,
    Absent,
    Leave,
}

impl fmt::Display for NurseScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NurseScheduleStatus::Scheduled => "scheduled",
            NurseScheduleStatus::Present => "present",
            NurseScheduleStatus::Absent => "absent",
            NurseScheduleStatus::Leave => "leave",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for NurseScheduleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(NurseScheduleStatus::Scheduled),
            "present" => Ok(NurseScheduleStatus::Present),
            "absent" => Ok(NurseScheduleStatus::Absent),
            "leave" => Ok(NurseScheduleStatus::Leave),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Booking of a nurse into a shift/date/room.
/// Unique on (nurse_id, shift_id, schedule_date).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NurseSchedule {
    pub id: i64,
    pub nurse_id: i64,
    pub shift_id: i64,
    pub schedule_date: NaiveDate,
    pub room_id: Option<i64>,
    pub status: NurseScheduleStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNurseSchedule {
    pub nurse_id: i64,
    pub shift_id: i64,
    pub schedule_date: NaiveDate,
    pub room_id: Option<i64>,
    #[serde(default)]
    pub status: Option<NurseScheduleStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNurseSchedule {
    pub shift_id: Option<i64>,
    pub schedule_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "crate::double_option")]
    pub room_id: Option<Option<i64>>,
    pub status: Option<NurseScheduleStatus>,
    #[serde(default, deserialize_with = "crate::double_option")]
    pub notes: Option<Option<String>>,
}
