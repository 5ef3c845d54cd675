// models/src/clinical/vitals.rs
//
// Accepted ranges for clinical measurements. Out-of-range values are
// rejected, never clamped.

use crate::errors::{ValidationError, ValidationResult};

/// Weight in grams (10 kg .. 200 kg).
pub const WEIGHT_G: (i64, i64) = (10_000, 200_000);
/// Systolic blood pressure, mmHg.
pub const SYSTOLIC_MMHG: (i64, i64) = (60, 250);
/// Diastolic blood pressure, mmHg.
pub const DIASTOLIC_MMHG: (i64, i64) = (30, 150);
/// Pulse, beats per minute.
pub const PULSE_BPM: (i64, i64) = (30, 200);
/// Body temperature, tenths of a degree Celsius.
pub const TEMPERATURE_DC: (i64, i64) = (300, 430);
/// Ultrafiltration goal or actual removal, mL.
pub const UF_ML: (i64, i64) = (0, 6_000);
/// Session duration, minutes.
pub const DURATION_MIN: (i64, i64) = (60, 480);
/// Blood pump flow, mL/min.
pub const BLOOD_FLOW_ML_MIN: (i64, i64) = (100, 500);
/// Dialysate flow, mL/min.
pub const DIALYSATE_FLOW_ML_MIN: (i64, i64) = (300, 800);

/// Checks one measurement against its range.
pub fn check(field: &'static str, value: i64, range: (i64, i64)) -> ValidationResult<()> {
    let (min, max) = range;
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

/// Same as [`check`] but skips absent values, for partial updates.
pub fn check_opt(
    field: &'static str,
    value: Option<i64>,
    range: (i64, i64),
) -> ValidationResult<()> {
    match value {
        Some(v) => check(field, v, range),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_below_and_above_range() {
        // 5 kg is below the plausible adult floor
        assert!(check("preWeight", 5_000, WEIGHT_G).is_err());
        assert!(check("preWeight", 250_000, WEIGHT_G).is_err());
        assert!(check("preWeight", 70_000, WEIGHT_G).is_ok());
    }

    #[test]
    fn boundaries_are_inclusive() {
        assert!(check("ufGoal", 0, UF_ML).is_ok());
        assert!(check("ufGoal", 6_000, UF_ML).is_ok());
        assert!(check("ufGoal", 6_001, UF_ML).is_err());
        assert!(check("duration", 60, DURATION_MIN).is_ok());
        assert!(check("duration", 59, DURATION_MIN).is_err());
    }

    #[test]
    fn absent_values_pass_partial_checks() {
        assert!(check_opt("pulse", None, PULSE_BPM).is_ok());
        assert!(check_opt("pulse", Some(500), PULSE_BPM).is_err());
    }
}
