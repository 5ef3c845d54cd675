// storage/src/schedules.rs
//
// Schedule slot persistence for both actor kinds. Double bookings are
// stopped by the UNIQUE constraints; this module translates those
// violations into domain conflicts with a readable message.

use chrono::Utc;
use sqlx::QueryBuilder;

use models::{
    ClinicError, ClinicResult, NewNurseSchedule, NewPatientSchedule, NurseSchedule,
    NurseScheduleStatus, PatientSchedule, PatientScheduleStatus, ScheduleFilter,
    UpdateNurseSchedule, UpdatePatientSchedule,
};

use crate::ClinicStore;

fn conflict_on_unique(err: sqlx::Error, message: &str) -> ClinicError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ClinicError::Conflict(message.to_string())
        }
        _ => err.into(),
    }
}

const PATIENT_BOOKING_CONFLICT: &str =
    "patient already has a schedule for this shift and date";
const NURSE_BOOKING_CONFLICT: &str = "nurse already has a schedule for this shift and date";

impl ClinicStore {
    // --- Patient schedules ---

    pub async fn create_patient_schedule(
        &self,
        new: &NewPatientSchedule,
    ) -> ClinicResult<PatientSchedule> {
        let now = Utc::now();
        let status = new.status.unwrap_or(PatientScheduleStatus::Scheduled);
        let id = sqlx::query(
            "INSERT INTO patient_schedules \
             (patient_id, shift_id, schedule_date, room_id, machine_id, nurse_id, status, notes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new.patient_id)
        .bind(new.shift_id)
        .bind(new.schedule_date)
        .bind(new.room_id)
        .bind(new.machine_id)
        .bind(new.nurse_id)
        .bind(status)
        .bind(&new.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, PATIENT_BOOKING_CONFLICT))?
        .last_insert_rowid();

        self.get_patient_schedule(id)
            .await?
            .ok_or_else(|| ClinicError::Storage("created schedule vanished".to_string()))
    }

    pub async fn get_patient_schedule(&self, id: i64) -> ClinicResult<Option<PatientSchedule>> {
        let row = sqlx::query_as::<_, PatientSchedule>(
            "SELECT * FROM patient_schedules WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Full-partial merge: absent fields keep their stored value, explicit
    /// nulls clear the optional foreign keys.
    pub async fn update_patient_schedule(
        &self,
        id: i64,
        patch: &UpdatePatientSchedule,
    ) -> ClinicResult<PatientSchedule> {
        let current = self
            .get_patient_schedule(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("patient schedule".to_string()))?;

        if let Some(next) = patch.status {
            if !current.status.can_change_to(next) {
                return Err(ClinicError::InvalidState(format!(
                    "schedule cannot move from {} to {}",
                    current.status, next
                )));
            }
        }

        let shift_id = patch.shift_id.unwrap_or(current.shift_id);
        let schedule_date = patch.schedule_date.unwrap_or(current.schedule_date);
        let room_id = patch.room_id.clone().unwrap_or(current.room_id);
        let machine_id = patch.machine_id.clone().unwrap_or(current.machine_id);
        let nurse_id = patch.nurse_id.clone().unwrap_or(current.nurse_id);
        let status = patch.status.unwrap_or(current.status);
        let notes = patch.notes.clone().unwrap_or(current.notes);

        sqlx::query(
            "UPDATE patient_schedules SET shift_id = ?, schedule_date = ?, room_id = ?, \
             machine_id = ?, nurse_id = ?, status = ?, notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(shift_id)
        .bind(schedule_date)
        .bind(room_id)
        .bind(machine_id)
        .bind(nurse_id)
        .bind(status)
        .bind(notes)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, PATIENT_BOOKING_CONFLICT))?;

        self.get_patient_schedule(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("patient schedule".to_string()))
    }

    pub async fn delete_patient_schedule(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM patient_schedules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("patient schedule".to_string()));
        }
        Ok(())
    }

    /// Filtered, paginated listing. `patient_scope` is the row-level
    /// restriction resolved by the access layer; it wins over any
    /// actor filter the caller supplied.
    pub async fn list_patient_schedules(
        &self,
        filter: &ScheduleFilter,
        patient_scope: Option<i64>,
    ) -> ClinicResult<(Vec<PatientSchedule>, i64)> {
        let actor = patient_scope.or(filter.actor_id);

        let mut query = QueryBuilder::new("SELECT * FROM patient_schedules WHERE 1 = 1");
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM patient_schedules WHERE 1 = 1");
        for builder in [&mut query, &mut count] {
            if let Some(patient_id) = actor {
                builder.push(" AND patient_id = ").push_bind(patient_id);
            }
            if let Some(shift_id) = filter.shift_id {
                builder.push(" AND shift_id = ").push_bind(shift_id);
            }
            if let Some(status) = &filter.status {
                builder.push(" AND status = ").push_bind(status);
            }
            if let Some(start) = filter.start_date {
                builder.push(" AND schedule_date >= ").push_bind(start);
            }
            if let Some(end) = filter.end_date {
                builder.push(" AND schedule_date <= ").push_bind(end);
            }
        }
        query
            .push(" ORDER BY schedule_date DESC, id DESC LIMIT ")
            .push_bind(filter.limit() as i64)
            .push(" OFFSET ")
            .push_bind(filter.offset() as i64);

        let rows = query
            .build_query_as::<PatientSchedule>()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
        Ok((rows, total))
    }

    /// Whether any session row references this schedule.
    pub async fn schedule_has_session(&self, schedule_id: i64) -> ClinicResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM hd_sessions WHERE patient_schedule_id = ?")
                .bind(schedule_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    // --- Nurse schedules ---

    pub async fn create_nurse_schedule(
        &self,
        new: &NewNurseSchedule,
    ) -> ClinicResult<NurseSchedule> {
        let now = Utc::now();
        let status = new.status.unwrap_or(NurseScheduleStatus::Scheduled);
        let id = sqlx::query(
            "INSERT INTO nurse_schedules \
             (nurse_id, shift_id, schedule_date, room_id, status, notes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new.nurse_id)
        .bind(new.shift_id)
        .bind(new.schedule_date)
        .bind(new.room_id)
        .bind(status)
        .bind(&new.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, NURSE_BOOKING_CONFLICT))?
        .last_insert_rowid();

        self.get_nurse_schedule(id)
            .await?
            .ok_or_else(|| ClinicError::Storage("created schedule vanished".to_string()))
    }

    pub async fn get_nurse_schedule(&self, id: i64) -> ClinicResult<Option<NurseSchedule>> {
        let row = sqlx::query_as::<_, NurseSchedule>("SELECT * FROM nurse_schedules WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update_nurse_schedule(
        &self,
        id: i64,
        patch: &UpdateNurseSchedule,
    ) -> ClinicResult<NurseSchedule> {
        let current = self
            .get_nurse_schedule(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("nurse schedule".to_string()))?;

        let shift_id = patch.shift_id.unwrap_or(current.shift_id);
        let schedule_date = patch.schedule_date.unwrap_or(current.schedule_date);
        let room_id = patch.room_id.clone().unwrap_or(current.room_id);
        let status = patch.status.unwrap_or(current.status);
        let notes = patch.notes.clone().unwrap_or(current.notes);

        sqlx::query(
            "UPDATE nurse_schedules SET shift_id = ?, schedule_date = ?, room_id = ?, \
             status = ?, notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(shift_id)
        .bind(schedule_date)
        .bind(room_id)
        .bind(status)
        .bind(notes)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, NURSE_BOOKING_CONFLICT))?;

        self.get_nurse_schedule(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("nurse schedule".to_string()))
    }

    pub async fn delete_nurse_schedule(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM nurse_schedules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("nurse schedule".to_string()));
        }
        Ok(())
    }

    pub async fn list_nurse_schedules(
        &self,
        filter: &ScheduleFilter,
    ) -> ClinicResult<(Vec<NurseSchedule>, i64)> {
        let mut query = QueryBuilder::new("SELECT * FROM nurse_schedules WHERE 1 = 1");
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM nurse_schedules WHERE 1 = 1");
        for builder in [&mut query, &mut count] {
            if let Some(nurse_id) = filter.actor_id {
                builder.push(" AND nurse_id = ").push_bind(nurse_id);
            }
            if let Some(shift_id) = filter.shift_id {
                builder.push(" AND shift_id = ").push_bind(shift_id);
            }
            if let Some(status) = &filter.status {
                builder.push(" AND status = ").push_bind(status);
            }
            if let Some(start) = filter.start_date {
                builder.push(" AND schedule_date >= ").push_bind(start);
            }
            if let Some(end) = filter.end_date {
                builder.push(" AND schedule_date <= ").push_bind(end);
            }
        }
        query
            .push(" ORDER BY schedule_date DESC, id DESC LIMIT ")
            .push_bind(filter.limit() as i64)
            .push(" OFFSET ")
            .push_bind(filter.offset() as i64);

        let rows = query
            .build_query_as::<NurseSchedule>()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
        Ok((rows, total))
    }
}
