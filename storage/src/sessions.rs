// storage/src/sessions.rs
//
// Session lifecycle primitives. Every transition that touches both the
// schedule and the session runs in one transaction, so a crash between the
// two writes cannot leave the pair inconsistent. The unique index on
// patient_schedule_id closes the concurrent double-start race that a
// pre-check alone would leave open.

use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Row};

use models::{
    ClinicError, ClinicResult, CompleteSessionRequest, HdSession, PatientScheduleStatus,
    SessionDetail, SessionFilter, SessionStatus, StartSessionRequest, UpdateSessionRequest,
};

use crate::ClinicStore;

impl ClinicStore {
    /// Converts an eligible schedule slot into a running session. The
    /// schedule is re-read inside the transaction so concurrent starts
    /// settle on the row state, and the unique index turns the loser of a
    /// simultaneous insert into a `Conflict`.
    pub async fn start_session(
        &self,
        req: &StartSessionRequest,
        recorded_by_nurse_id: i64,
    ) -> ClinicResult<HdSession> {
        let now = Utc::now();
        let start_time = req.start_time.unwrap_or(now);
        let mut tx = self.pool.begin().await?;

        let schedule = sqlx::query("SELECT patient_id, schedule_date, status FROM patient_schedules WHERE id = ?")
            .bind(req.patient_schedule_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ClinicError::NotFound("patient schedule".to_string()))?;
        let patient_id: i64 = schedule.get("patient_id");
        let session_date: chrono::NaiveDate = schedule.get("schedule_date");
        let status: PatientScheduleStatus = schedule.get("status");

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM hd_sessions WHERE patient_schedule_id = ?")
                .bind(req.patient_schedule_id)
                .fetch_one(&mut *tx)
                .await?;
        if existing > 0 {
            return Err(ClinicError::Conflict(
                "a session already exists for this schedule".to_string(),
            ));
        }
        if !status.session_eligible() {
            return Err(ClinicError::InvalidState(format!(
                "cannot start a session for a schedule in status {}",
                status
            )));
        }

        let session_id = sqlx::query(
            "INSERT INTO hd_sessions \
             (patient_schedule_id, patient_id, session_date, start_time, \
              pre_weight_g, pre_systolic, pre_diastolic, pre_pulse, pre_temperature, complaints, \
              uf_goal_ml, blood_flow_ml_min, dialysate_flow_ml_min, duration_min, \
              vascular_access, dialyzer, anticoagulant, dialysate, machine_id, protocol_id, \
              status, recorded_by_nurse_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(req.patient_schedule_id)
        .bind(patient_id)
        .bind(session_date)
        .bind(start_time)
        .bind(req.pre_weight_g)
        .bind(req.pre_systolic)
        .bind(req.pre_diastolic)
        .bind(req.pre_pulse)
        .bind(req.pre_temperature)
        .bind(&req.complaints)
        .bind(req.uf_goal_ml)
        .bind(req.blood_flow_ml_min)
        .bind(req.dialysate_flow_ml_min)
        .bind(req.duration_min)
        .bind(&req.vascular_access)
        .bind(&req.dialyzer)
        .bind(&req.anticoagulant)
        .bind(&req.dialysate)
        .bind(req.machine_id)
        .bind(req.protocol_id)
        .bind(SessionStatus::InProgress)
        .bind(recorded_by_nurse_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => ClinicError::Conflict(
                "a session already exists for this schedule".to_string(),
            ),
            _ => e.into(),
        })?
        .last_insert_rowid();

        sqlx::query("UPDATE patient_schedules SET status = ?, updated_at = ? WHERE id = ?")
            .bind(PatientScheduleStatus::InProgress)
            .bind(now)
            .bind(req.patient_schedule_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_session(session_id)
            .await?
            .ok_or_else(|| ClinicError::Storage("created session vanished".to_string()))
    }

    /// Patches pre-assessment and HD-parameter fields of a running session.
    pub async fn update_session(
        &self,
        id: i64,
        patch: &UpdateSessionRequest,
    ) -> ClinicResult<HdSession> {
        let current = self
            .get_session(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("session".to_string()))?;
        if current.status != SessionStatus::InProgress {
            return Err(ClinicError::InvalidState(format!(
                "session is {} and can no longer be edited",
                current.status
            )));
        }

        sqlx::query(
            "UPDATE hd_sessions SET pre_weight_g = ?, pre_systolic = ?, pre_diastolic = ?, \
             pre_pulse = ?, pre_temperature = ?, complaints = ?, uf_goal_ml = ?, \
             blood_flow_ml_min = ?, dialysate_flow_ml_min = ?, duration_min = ?, \
             vascular_access = ?, dialyzer = ?, anticoagulant = ?, dialysate = ?, \
             machine_id = ?, protocol_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(patch.pre_weight_g.unwrap_or(current.pre_weight_g))
        .bind(patch.pre_systolic.or(current.pre_systolic))
        .bind(patch.pre_diastolic.or(current.pre_diastolic))
        .bind(patch.pre_pulse.or(current.pre_pulse))
        .bind(patch.pre_temperature.or(current.pre_temperature))
        .bind(patch.complaints.clone().or(current.complaints))
        .bind(patch.uf_goal_ml.or(current.uf_goal_ml))
        .bind(patch.blood_flow_ml_min.or(current.blood_flow_ml_min))
        .bind(patch.dialysate_flow_ml_min.or(current.dialysate_flow_ml_min))
        .bind(patch.duration_min.or(current.duration_min))
        .bind(patch.vascular_access.clone().or(current.vascular_access))
        .bind(patch.dialyzer.clone().or(current.dialyzer))
        .bind(patch.anticoagulant.clone().or(current.anticoagulant))
        .bind(patch.dialysate.clone().or(current.dialysate))
        .bind(patch.machine_id.or(current.machine_id))
        .bind(patch.protocol_id.or(current.protocol_id))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_session(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("session".to_string()))
    }

    /// Finalizes a running session: post vitals, end time, and both statuses
    /// move to completed in one transaction. Not idempotent by design.
    pub async fn complete_session(
        &self,
        id: i64,
        req: &CompleteSessionRequest,
    ) -> ClinicResult<HdSession> {
        let now = Utc::now();
        let end_time = req.end_time.unwrap_or(now);
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT patient_schedule_id, status FROM hd_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ClinicError::NotFound("session".to_string()))?;
        let schedule_id: i64 = row.get("patient_schedule_id");
        let status: SessionStatus = row.get("status");
        if status != SessionStatus::InProgress {
            return Err(ClinicError::InvalidState(format!(
                "session is already {}",
                status
            )));
        }

        sqlx::query(
            "UPDATE hd_sessions SET post_weight_g = ?, post_systolic = ?, post_diastolic = ?, \
             post_pulse = ?, actual_uf_ml = ?, post_notes = ?, end_time = ?, status = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(req.post_weight_g)
        .bind(req.post_systolic)
        .bind(req.post_diastolic)
        .bind(req.post_pulse)
        .bind(req.actual_uf_ml)
        .bind(&req.post_notes)
        .bind(end_time)
        .bind(SessionStatus::Completed)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE patient_schedules SET status = ?, updated_at = ? WHERE id = ?")
            .bind(PatientScheduleStatus::Completed)
            .bind(now)
            .bind(schedule_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_session(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("session".to_string()))
    }

    /// Hard-deletes a session and rolls the paired schedule back to
    /// `confirmed`, in one transaction.
    pub async fn delete_session(&self, id: i64) -> ClinicResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT patient_schedule_id FROM hd_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ClinicError::NotFound("session".to_string()))?;
        let schedule_id: i64 = row.get("patient_schedule_id");

        sqlx::query("DELETE FROM hd_session_complications WHERE hd_session_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM hd_session_medications WHERE hd_session_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM hd_sessions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE patient_schedules SET status = ?, updated_at = ? WHERE id = ?")
            .bind(PatientScheduleStatus::Confirmed)
            .bind(now)
            .bind(schedule_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_session(&self, id: i64) -> ClinicResult<Option<HdSession>> {
        let row = sqlx::query_as::<_, HdSession>("SELECT * FROM hd_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn session_for_schedule(&self, schedule_id: i64) -> ClinicResult<Option<HdSession>> {
        let row = sqlx::query_as::<_, HdSession>(
            "SELECT * FROM hd_sessions WHERE patient_schedule_id = ?",
        )
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Assembles the full read view: joined display names plus nested
    /// complication and medication lists.
    pub async fn get_session_detail(&self, id: i64) -> ClinicResult<Option<SessionDetail>> {
        let row = sqlx::query(
            "SELECT s.*, sh.name AS shift_name, r.name AS room_name, m.name AS machine_name, \
             n.first_name || ' ' || n.last_name AS nurse_name, p.name AS protocol_name \
             FROM hd_sessions s \
             JOIN patient_schedules ps ON ps.id = s.patient_schedule_id \
             LEFT JOIN shifts sh ON sh.id = ps.shift_id \
             LEFT JOIN rooms r ON r.id = ps.room_id \
             LEFT JOIN machines m ON m.id = s.machine_id \
             LEFT JOIN nurses n ON n.id = s.recorded_by_nurse_id \
             LEFT JOIN protocols p ON p.id = s.protocol_id \
             WHERE s.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let session = HdSession::from_row(&row).map_err(ClinicError::from)?;
        let complications = self.list_complications(id).await?;
        let medications = self.list_medications(id).await?;

        Ok(Some(SessionDetail {
            session,
            shift_name: row.try_get("shift_name").ok(),
            room_name: row.try_get("room_name").ok(),
            machine_name: row.try_get("machine_name").ok(),
            nurse_name: row.try_get("nurse_name").ok(),
            protocol_name: row.try_get("protocol_name").ok(),
            complications,
            medications,
        }))
    }

    pub async fn list_sessions(
        &self,
        filter: &SessionFilter,
        patient_scope: Option<i64>,
    ) -> ClinicResult<(Vec<HdSession>, i64)> {
        let patient = patient_scope.or(filter.patient_id);

        let mut query = QueryBuilder::new("SELECT * FROM hd_sessions WHERE 1 = 1");
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM hd_sessions WHERE 1 = 1");
        for builder in [&mut query, &mut count] {
            if let Some(patient_id) = patient {
                builder.push(" AND patient_id = ").push_bind(patient_id);
            }
            if let Some(status) = &filter.status {
                builder.push(" AND status = ").push_bind(status);
            }
            if let Some(start) = filter.start_date {
                builder.push(" AND session_date >= ").push_bind(start);
            }
            if let Some(end) = filter.end_date {
                builder.push(" AND session_date <= ").push_bind(end);
            }
        }
        query
            .push(" ORDER BY session_date DESC, id DESC LIMIT ")
            .push_bind(filter.limit() as i64)
            .push(" OFFSET ")
            .push_bind(filter.offset() as i64);

        let rows = query
            .build_query_as::<HdSession>()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
        Ok((rows, total))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use models::{NewPatientSchedule, PatientScheduleStatus};

    pub(crate) struct Fixture {
        pub store: ClinicStore,
        pub schedule_id: i64,
        pub nurse_id: i64,
    }

    pub(crate) async fn fixture() -> Fixture {
        let store = ClinicStore::in_memory().await.unwrap();
        let patient_id = store.insert_patient(None, "Rina", "Hartono").await.unwrap();
        let nurse_id = store.insert_nurse(None, "Sari", "Wijaya").await.unwrap();
        let shift_id = store
            .insert_shift("Morning", "07:00", "12:00")
            .await
            .unwrap();
        let schedule = store
            .create_patient_schedule(&NewPatientSchedule {
                patient_id,
                shift_id,
                schedule_date: "2024-01-10".parse().unwrap(),
                room_id: None,
                machine_id: None,
                nurse_id: Some(nurse_id),
                status: Some(PatientScheduleStatus::Confirmed),
                notes: None,
            })
            .await
            .unwrap();
        Fixture {
            store,
            schedule_id: schedule.id,
            nurse_id,
        }
    }

    pub(crate) fn start_request(schedule_id: i64) -> StartSessionRequest {
        StartSessionRequest {
            patient_schedule_id: schedule_id,
            start_time: None,
            pre_weight_g: 65_000,
            pre_systolic: Some(130),
            pre_diastolic: Some(85),
            pre_pulse: Some(78),
            pre_temperature: Some(36.5),
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

    fn complete_request() -> CompleteSessionRequest {
        CompleteSessionRequest {
            end_time: None,
            post_weight_g: 63_500,
            post_systolic: Some(120),
            post_diastolic: Some(80),
            post_pulse: Some(74),
            actual_uf_ml: Some(1_500),
            post_notes: None,
        }
    }

    #[tokio::test]
    async fn start_moves_both_aggregates_to_in_progress() {
        let f = fixture().await;
        let session = f
            .store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.pre_weight_g, 65_000);

        let schedule = f
            .store
            .get_patient_schedule(f.schedule_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(schedule.status, PatientScheduleStatus::InProgress);
    }

    #[tokio::test]
    async fn second_start_for_same_schedule_is_a_conflict() {
        let f = fixture().await;
        f.store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap();
        let err = f
            .store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn start_on_cancelled_schedule_is_invalid_state() {
        let f = fixture().await;
        sqlx::query("UPDATE patient_schedules SET status = 'cancelled' WHERE id = ?")
            .bind(f.schedule_id)
            .execute(f.store.pool())
            .await
            .unwrap();
        let err = f
            .store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidState(_)));
    }

    #[tokio::test]
    async fn complete_is_not_idempotent() {
        let f = fixture().await;
        let session = f
            .store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap();

        let completed = f
            .store
            .complete_session(session.id, &complete_request())
            .await
            .unwrap();
        assert_eq!(completed.status, SessionStatus::Completed);
        assert!(completed.end_time.is_some());
        assert_eq!(completed.actual_uf_ml, Some(1_500));

        let err = f
            .store
            .complete_session(session.id, &complete_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidState(_)), "got {err:?}");

        let schedule = f
            .store
            .get_patient_schedule(f.schedule_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(schedule.status, PatientScheduleStatus::Completed);
    }

    #[tokio::test]
    async fn delete_rolls_schedule_back_to_confirmed() {
        let f = fixture().await;
        let session = f
            .store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap();
        f.store
            .complete_session(session.id, &complete_request())
            .await
            .unwrap();

        f.store.delete_session(session.id).await.unwrap();

        assert!(f.store.get_session(session.id).await.unwrap().is_none());
        let schedule = f
            .store
            .get_patient_schedule(f.schedule_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(schedule.status, PatientScheduleStatus::Confirmed);

        // The slot is startable again.
        f.store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_patches_only_provided_fields() {
        let f = fixture().await;
        let session = f
            .store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap();

        let patch = UpdateSessionRequest {
            uf_goal_ml: Some(2_500),
            ..Default::default()
        };
        let updated = f.store.update_session(session.id, &patch).await.unwrap();
        assert_eq!(updated.uf_goal_ml, Some(2_500));
        assert_eq!(updated.pre_weight_g, 65_000);
        assert_eq!(updated.blood_flow_ml_min, Some(300));
    }

    #[tokio::test]
    async fn completed_session_rejects_edits() {
        let f = fixture().await;
        let session = f
            .store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap();
        f.store
            .complete_session(session.id, &complete_request())
            .await
            .unwrap();

        let err = f
            .store
            .update_session(session.id, &UpdateSessionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidState(_)));
    }
}
