// models/src/lib.rs
//
// Domain entities and error taxonomy for the HD clinic core. Stored rows
// derive `sqlx::FromRow`; request DTOs are plain serde structs validated
// before they reach storage.

pub mod calendar;
pub mod clinical;
pub mod errors;

pub use errors::{ClinicError, ClinicResult, ValidationError, ValidationResult};

pub use clinical::hd_session::{
    CompleteSessionRequest, HdSession, SessionDetail, SessionFilter, SessionStatus,
    StartSessionRequest, UpdateSessionRequest,
};
pub use clinical::nurse_schedule::{
    NewNurseSchedule, NurseSchedule, NurseScheduleStatus, UpdateNurseSchedule,
};
pub use clinical::patient_schedule::{
    NewPatientSchedule, PatientSchedule, PatientScheduleStatus, ScheduleFilter,
    UpdatePatientSchedule,
};
pub use clinical::session_event::{
    HdSessionComplication, HdSessionMedication, NewComplication, NewMedication,
};
pub use calendar::{CalendarAuthToken, CalendarSyncMapping, ScheduleType, SyncReport};

use serde::{Deserialize, Deserializer};

/// Deserializes a doubly-optional field so that an absent key and an explicit
/// `null` stay distinguishable: absent -> `None`, `null` -> `Some(None)`,
/// a value -> `Some(Some(v))`. Used by partial-update DTOs where `null`
/// clears an optional foreign key.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
