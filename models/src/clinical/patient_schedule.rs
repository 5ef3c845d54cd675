// models/src/clinical/patient_schedule.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Lifecycle of a patient booking. Statuses only move forward; the session
/// lifecycle engine is the sole writer of `InProgress` and `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PatientScheduleStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl PatientScheduleStatus {
    /// Whether a session may be started from this slot.
    pub fn session_eligible(&self) -> bool {
        matches!(
            self,
            PatientScheduleStatus::Scheduled | PatientScheduleStatus::Confirmed
        )
    }

    /// Transitions the booking endpoints may apply. `InProgress` and
    /// `Completed` are written only by the session engine, and closed
    /// slots stay closed; rolling a slot back is never a patch.
    pub fn can_change_to(&self, next: PatientScheduleStatus) -> bool {
        use PatientScheduleStatus::*;
        if *self == next {
            return true;
        }
        match self {
            Scheduled => matches!(next, Confirmed | Cancelled | NoShow),
            Confirmed => matches!(next, Cancelled | NoShow),
            InProgress | Completed | Cancelled | NoShow => false,
        }
    }
}

impl fmt::Display for PatientScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatientScheduleStatus::Scheduled => "scheduled",
            PatientScheduleStatus::Confirmed => "confirmed",
            PatientScheduleStatus::InProgress => "in_progress",
            PatientScheduleStatus::Completed => "completed",
            PatientScheduleStatus::Cancelled => "cancelled",
            PatientScheduleStatus::NoShow => "no_show",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PatientScheduleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(PatientScheduleStatus::Scheduled),
            "confirmed" => Ok(PatientScheduleStatus::Confirmed),
            "in_progress" => Ok(PatientScheduleStatus::InProgress),
            "completed" => Ok(PatientScheduleStatus::Completed),
            "cancelled" => Ok(PatientScheduleStatus::Cancelled),
            "no_show" => Ok(PatientScheduleStatus::NoShow),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// One calendar-slot booking of a patient into a shift, optionally bound to
/// a room, machine and nurse. Unique on (patient_id, shift_id, schedule_date).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PatientSchedule {
    pub id: i64,
    pub patient_id: i64,
    pub shift_id: i64,
    pub schedule_date: NaiveDate,
    pub room_id: Option<i64>,
    pub machine_id: Option<i64>,
    pub nurse_id: Option<i64>,
    pub status: PatientScheduleStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatientSchedule {
    pub patient_id: i64,
    pub shift_id: i64,
    pub schedule_date: NaiveDate,
    pub room_id: Option<i64>,
    pub machine_id: Option<i64>,
    pub nurse_id: Option<i64>,
    #[serde(default)]
    pub status: Option<PatientScheduleStatus>,
    pub notes: Option<String>,
}

/// Partial update: absent fields keep their value, explicit `null` on the
/// optional foreign keys clears the association.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientSchedule {
    pub shift_id: Option<i64>,
    pub schedule_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "crate::double_option")]
    pub room_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "crate::double_option")]
    pub machine_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "crate::double_option")]
    pub nurse_id: Option<Option<i64>>,
    pub status: Option<PatientScheduleStatus>,
    #[serde(default, deserialize_with = "crate::double_option")]
    pub notes: Option<Option<String>>,
}

/// List filters shared by the patient and nurse schedule endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFilter {
    pub actor_id: Option<i64>,
    pub shift_id: Option<i64>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ScheduleFilter {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> u64 {
        (self.page() as u64 - 1) * self.limit() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            PatientScheduleStatus::Scheduled,
            PatientScheduleStatus::Confirmed,
            PatientScheduleStatus::InProgress,
            PatientScheduleStatus::Completed,
            PatientScheduleStatus::Cancelled,
            PatientScheduleStatus::NoShow,
        ] {
            assert_eq!(s.to_string().parse::<PatientScheduleStatus>().unwrap(), s);
        }
        assert!("archived".parse::<PatientScheduleStatus>().is_err());
    }

    #[test]
    fn update_distinguishes_absent_from_null() {
        let patch: UpdatePatientSchedule = serde_json::from_str(r#"{"roomId": null}"#).unwrap();
        assert_eq!(patch.room_id, Some(None));
        assert_eq!(patch.machine_id, None);

        let patch: UpdatePatientSchedule = serde_json::from_str(r#"{"roomId": 3}"#).unwrap();
        assert_eq!(patch.room_id, Some(Some(3)));
    }

    #[test]
    fn only_open_slots_are_session_eligible() {
        assert!(PatientScheduleStatus::Scheduled.session_eligible());
        assert!(PatientScheduleStatus::Confirmed.session_eligible());
        assert!(!PatientScheduleStatus::Completed.session_eligible());
        assert!(!PatientScheduleStatus::Cancelled.session_eligible());
    }

    #[test]
    fn booking_statuses_never_move_backward() {
        use PatientScheduleStatus::*;
        assert!(Scheduled.can_change_to(Confirmed));
        assert!(Scheduled.can_change_to(Cancelled));
        assert!(Confirmed.can_change_to(NoShow));
        assert!(Confirmed.can_change_to(Confirmed));

        assert!(!Confirmed.can_change_to(Scheduled));
        assert!(!InProgress.can_change_to(Scheduled));
        assert!(!Completed.can_change_to(Scheduled));
        assert!(!Cancelled.can_change_to(Confirmed));
        // The session engine owns these writes.
        assert!(!Scheduled.can_change_to(InProgress));
        assert!(!Confirmed.can_change_to(Completed));
    }

    #[test]
    fn offset_survives_absurd_page_numbers() {
        let filter = ScheduleFilter {
            page: Some(u32::MAX),
            limit: Some(100),
            ..Default::default()
        };
        assert_eq!(filter.offset(), (u32::MAX as u64 - 1) * 100);
    }
}
