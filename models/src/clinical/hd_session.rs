// models/src/clinical/hd_session.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clinical::session_event::{HdSessionComplication, HdSessionMedication};
use crate::clinical::vitals;
use crate::errors::{ValidationError, ValidationResult};

/// Lifecycle of a dialysis session. Moves forward only:
/// `in_progress -> completed` (or `-> terminated`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Terminated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Terminated => "terminated",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "terminated" => Ok(SessionStatus::Terminated),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// The clinical record of one dialysis treatment. Exactly zero-or-one per
/// patient schedule; the pairing is a real unique constraint in storage.
///
/// Weights are grams, pressures mmHg, flows mL/min, temperature Celsius.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HdSession {
    pub id: i64,
    pub patient_schedule_id: i64,
    pub patient_id: i64,
    pub session_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,

    // Pre-assessment
    pub pre_weight_g: i64,
    pub pre_systolic: Option<i64>,
    pub pre_diastolic: Option<i64>,
    pub pre_pulse: Option<i64>,
    pub pre_temperature: Option<f64>,
    pub complaints: Option<String>,

    // HD parameters
    pub uf_goal_ml: Option<i64>,
    pub blood_flow_ml_min: Option<i64>,
    pub dialysate_flow_ml_min: Option<i64>,
    pub duration_min: Option<i64>,
    pub vascular_access: Option<String>,
    pub dialyzer: Option<String>,
    pub anticoagulant: Option<String>,
    pub dialysate: Option<String>,
    pub machine_id: Option<i64>,
    pub protocol_id: Option<i64>,

    // Post-assessment
    pub post_weight_g: Option<i64>,
    pub post_systolic: Option<i64>,
    pub post_diastolic: Option<i64>,
    pub post_pulse: Option<i64>,
    pub actual_uf_ml: Option<i64>,
    pub post_notes: Option<String>,

    pub status: SessionStatus,
    pub recorded_by_nurse_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for `POST /hd-sessions`: converts an eligible schedule slot into
/// a running session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub patient_schedule_id: i64,
    /// Defaults to the current instant.
    pub start_time: Option<DateTime<Utc>>,

    pub pre_weight_g: i64,
    pub pre_systolic: Option<i64>,
    pub pre_diastolic: Option<i64>,
    pub pre_pulse: Option<i64>,
    pub pre_temperature: Option<f64>,
    pub complaints: Option<String>,

    pub uf_goal_ml: Option<i64>,
    pub blood_flow_ml_min: Option<i64>,
    pub dialysate_flow_ml_min: Option<i64>,
    pub duration_min: Option<i64>,
    pub vascular_access: Option<String>,
    pub dialyzer: Option<String>,
    pub anticoagulant: Option<String>,
    pub dialysate: Option<String>,
    pub machine_id: Option<i64>,
    pub protocol_id: Option<i64>,
}

impl StartSessionRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        vitals::check("preWeightG", self.pre_weight_g, vitals::WEIGHT_G)?;
        vitals::check_opt("preSystolic", self.pre_systolic, vitals::SYSTOLIC_MMHG)?;
        vitals::check_opt("preDiastolic", self.pre_diastolic, vitals::DIASTOLIC_MMHG)?;
        vitals::check_opt("prePulse", self.pre_pulse, vitals::PULSE_BPM)?;
        check_temperature(self.pre_temperature)?;
        vitals::check_opt("ufGoalMl", self.uf_goal_ml, vitals::UF_ML)?;
        vitals::check_opt(
            "bloodFlowMlMin",
            self.blood_flow_ml_min,
            vitals::BLOOD_FLOW_ML_MIN,
        )?;
        vitals::check_opt(
            "dialysateFlowMlMin",
            self.dialysate_flow_ml_min,
            vitals::DIALYSATE_FLOW_ML_MIN,
        )?;
        vitals::check_opt("durationMin", self.duration_min, vitals::DURATION_MIN)?;
        Ok(())
    }
}

/// Payload for `PUT /hd-sessions/{id}`: patches pre-assessment and HD
/// parameter fields of a running session. Statuses are never touched here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub pre_weight_g: Option<i64>,
    pub pre_systolic: Option<i64>,
    pub pre_diastolic: Option<i64>,
    pub pre_pulse: Option<i64>,
    pub pre_temperature: Option<f64>,
    pub complaints: Option<String>,

    pub uf_goal_ml: Option<i64>,
    pub blood_flow_ml_min: Option<i64>,
    pub dialysate_flow_ml_min: Option<i64>,
    pub duration_min: Option<i64>,
    pub vascular_access: Option<String>,
    pub dialyzer: Option<String>,
    pub anticoagulant: Option<String>,
    pub dialysate: Option<String>,
    pub machine_id: Option<i64>,
    pub protocol_id: Option<i64>,
}

impl UpdateSessionRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        vitals::check_opt("preWeightG", self.pre_weight_g, vitals::WEIGHT_G)?;
        vitals::check_opt("preSystolic", self.pre_systolic, vitals::SYSTOLIC_MMHG)?;
        vitals::check_opt("preDiastolic", self.pre_diastolic, vitals::DIASTOLIC_MMHG)?;
        vitals::check_opt("prePulse", self.pre_pulse, vitals::PULSE_BPM)?;
        check_temperature(self.pre_temperature)?;
        vitals::check_opt("ufGoalMl", self.uf_goal_ml, vitals::UF_ML)?;
        vitals::check_opt(
            "bloodFlowMlMin",
            self.blood_flow_ml_min,
            vitals::BLOOD_FLOW_ML_MIN,
        )?;
        vitals::check_opt(
            "dialysateFlowMlMin",
            self.dialysate_flow_ml_min,
            vitals::DIALYSATE_FLOW_ML_MIN,
        )?;
        vitals::check_opt("durationMin", self.duration_min, vitals::DURATION_MIN)?;
        Ok(())
    }
}

/// Payload for `POST /hd-sessions/{id}/complete`: post-assessment vitals and
/// the end of treatment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionRequest {
    /// Defaults to the current instant.
    pub end_time: Option<DateTime<Utc>>,
    pub post_weight_g: i64,
    pub post_systolic: Option<i64>,
    pub post_diastolic: Option<i64>,
    pub post_pulse: Option<i64>,
    pub actual_uf_ml: Option<i64>,
    pub post_notes: Option<String>,
}

impl CompleteSessionRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        vitals::check("postWeightG", self.post_weight_g, vitals::WEIGHT_G)?;
        vitals::check_opt("postSystolic", self.post_systolic, vitals::SYSTOLIC_MMHG)?;
        vitals::check_opt("postDiastolic", self.post_diastolic, vitals::DIASTOLIC_MMHG)?;
        vitals::check_opt("postPulse", self.post_pulse, vitals::PULSE_BPM)?;
        vitals::check_opt("actualUfMl", self.actual_uf_ml, vitals::UF_ML)?;
        Ok(())
    }
}

fn check_temperature(value: Option<f64>) -> ValidationResult<()> {
    // Validated in tenths of a degree so the shared integer ranges apply.
    vitals::check_opt(
        "preTemperature",
        value.map(|t| (t * 10.0).round() as i64),
        vitals::TEMPERATURE_DC,
    )
}

/// Session list filters for `GET /hd-sessions` and the portal view.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFilter {
    pub patient_id: Option<i64>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl SessionFilter {
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

/// Full read view of a session: joined display names plus nested event lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: HdSession,
    pub shift_name: Option<String>,
    pub room_name: Option<String>,
    pub machine_name: Option<String>,
    pub nurse_name: Option<String>,
    pub protocol_name: Option<String>,
    pub complications: Vec<HdSessionComplication>,
    pub medications: Vec<HdSessionMedication>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_request(pre_weight_g: i64) -> StartSessionRequest {
        StartSessionRequest {
            patient_schedule_id: 1,
            start_time: None,
            pre_weight_g,
            pre_systolic: Some(120),
            pre_diastolic: Some(80),
            pre_pulse: Some(72),
            pre_temperature: Some(36.6),
            complaints: None,
            uf_goal_ml: Some(2_000),
            blood_flow_ml_min: Some(300),
            dialysate_flow_ml_min: Some(500),
            duration_min: Some(240),
            vascular_access: Some("AVF".to_string()),
            dialyzer: None,
            anticoagulant: Some("heparin".to_string()),
            dialysate: None,
            machine_id: None,
            protocol_id: None,
        }
    }

    #[test]
    fn plausible_start_request_passes() {
        assert!(start_request(70_000).validate().is_ok());
    }

    #[test]
    fn five_kg_pre_weight_is_rejected() {
        let err = start_request(5_000).validate().unwrap_err();
        assert_eq!(err.field(), Some("preWeightG"));
    }

    #[test]
    fn fever_beyond_range_is_rejected() {
        let mut req = start_request(70_000);
        req.pre_temperature = Some(45.0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn complete_request_checks_post_fields() {
        let ok = CompleteSessionRequest {
            end_time: None,
            post_weight_g: 63_500,
            post_systolic: Some(110),
            post_diastolic: Some(70),
            post_pulse: Some(68),
            actual_uf_ml: Some(1_500),
            post_notes: None,
        };
        assert!(ok.validate().is_ok());

        let bad = CompleteSessionRequest {
            actual_uf_ml: Some(9_000),
            ..ok
        };
        assert!(bad.validate().is_err());
    }
}
