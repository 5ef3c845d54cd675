// clinical/src/lifecycle.rs
//
// Session lifecycle service. Validates vitals, resolves who the recording
// nurse is, then hands the transition to storage where both aggregates move
// in one transaction.

use models::{
    ClinicError, ClinicResult, CompleteSessionRequest, HdSession, SessionDetail, SessionFilter,
    StartSessionRequest, UpdateSessionRequest, ValidationError,
};
use security::{CallerContext, Permission, Role};
use storage::ClinicStore;
use tracing::info;

#[derive(Clone)]
pub struct SessionLifecycle {
    store: ClinicStore,
}

impl SessionLifecycle {
    pub fn new(store: ClinicStore) -> Self {
        SessionLifecycle { store }
    }

    /// The nurse a new session is attributed to. Nurse callers record as
    /// themselves; admins without a nurse profile fall back to the nurse
    /// assigned on the schedule.
    async fn resolve_recording_nurse(
        &self,
        ctx: &CallerContext,
        schedule_id: i64,
    ) -> ClinicResult<i64> {
        if !ctx.role.can_record_sessions() {
            return Err(ClinicError::Forbidden(
                "only nursing staff can record sessions".to_string(),
            ));
        }
        if let Some(nurse_id) = ctx.nurse_id {
            return Ok(nurse_id);
        }
        if ctx.role == Role::Admin {
            let schedule = self
                .store
                .get_patient_schedule(schedule_id)
                .await?
                .ok_or_else(|| ClinicError::NotFound("patient schedule".to_string()))?;
            if let Some(nurse_id) = schedule.nurse_id {
                return Ok(nurse_id);
            }
            return Err(ValidationError::MissingField("recordedByNurseId").into());
        }
        Err(ClinicError::Forbidden(
            "no nurse profile linked to account".to_string(),
        ))
    }

    pub async fn start(
        &self,
        ctx: &CallerContext,
        req: &StartSessionRequest,
    ) -> ClinicResult<HdSession> {
        ctx.require(Permission::HdSessionCreate)?;
        req.validate()?;
        let nurse_id = self
            .resolve_recording_nurse(ctx, req.patient_schedule_id)
            .await?;
        let session = self.store.start_session(req, nurse_id).await?;
        info!(
            session_id = session.id,
            schedule_id = session.patient_schedule_id,
            nurse_id,
            "hd session started"
        );
        Ok(session)
    }

    pub async fn update(
        &self,
        ctx: &CallerContext,
        id: i64,
        patch: &UpdateSessionRequest,
    ) -> ClinicResult<HdSession> {
        ctx.require(Permission::HdSessionUpdate)?;
        patch.validate()?;
        self.store.update_session(id, patch).await
    }

    pub async fn complete(
        &self,
        ctx: &CallerContext,
        id: i64,
        req: &CompleteSessionRequest,
    ) -> ClinicResult<HdSession> {
        ctx.require(Permission::HdSessionComplete)?;
        req.validate()?;
        let session = self.store.complete_session(id, req).await?;
        info!(session_id = id, "hd session completed");
        Ok(session)
    }

    pub async fn delete(&self, ctx: &CallerContext, id: i64) -> ClinicResult<()> {
        ctx.require(Permission::HdSessionDelete)?;
        self.store.delete_session(id).await?;
        info!(session_id = id, "hd session deleted, schedule rolled back");
        Ok(())
    }

    pub async fn get_detail(&self, ctx: &CallerContext, id: i64) -> ClinicResult<SessionDetail> {
        ctx.require(Permission::HdSessionRead)?;
        let detail = self
            .store
            .get_session_detail(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("session".to_string()))?;
        ctx.ensure_patient_access(detail.session.patient_id)?;
        Ok(detail)
    }

    pub async fn list(
        &self,
        ctx: &CallerContext,
        filter: &SessionFilter,
    ) -> ClinicResult<(Vec<HdSession>, i64)> {
        ctx.require(Permission::HdSessionRead)?;
        let scope = if ctx.role == Role::Patient {
            Some(ctx.own_patient_id()?)
        } else {
            None
        };
        self.store.list_sessions(filter, scope).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schedules::tests::roles;
    use models::{NewPatientSchedule, PatientScheduleStatus, SessionStatus};

    pub(crate) struct World {
        pub store: ClinicStore,
        pub lifecycle: SessionLifecycle,
        pub schedule_id: i64,
        pub patient_id: i64,
        pub nurse_ctx: CallerContext,
    }

    pub(crate) async fn world() -> World {
        let store = ClinicStore::in_memory().await.unwrap();
        let nurse_user = store.insert_user("nurse.sari", 3).await.unwrap();
        let patient_id = store.insert_patient(None, "Rina", "Hartono").await.unwrap();
        let nurse_id = store
            .insert_nurse(Some(nurse_user), "Sari", "Wijaya")
            .await
            .unwrap();
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

        let config = roles();
        let nurse_ctx =
            CallerContext::new(nurse_user, Role::Nurse, &config).with_nurse(Some(nurse_id));
        World {
            lifecycle: SessionLifecycle::new(store.clone()),
            store,
            schedule_id: schedule.id,
            patient_id,
            nurse_ctx,
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

    #[tokio::test]
    async fn out_of_range_vitals_never_reach_storage() {
        let w = world().await;
        let mut req = start_request(w.schedule_id);
        req.pre_weight_g = 5_000;
        let err = w.lifecycle.start(&w.nurse_ctx, &req).await.unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)), "got {err:?}");

        // The schedule is untouched.
        let schedule = w
            .store
            .get_patient_schedule(w.schedule_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(schedule.status, PatientScheduleStatus::Confirmed);
    }

    #[tokio::test]
    async fn doctor_cannot_start_a_session() {
        let w = world().await;
        let config = roles();
        let doctor = CallerContext::new(99, Role::Doctor, &config);
        let err = w
            .lifecycle
            .start(&doctor, &start_request(w.schedule_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_start_falls_back_to_assigned_nurse() {
        let w = world().await;
        let config = roles();
        let admin = CallerContext::new(1, Role::Admin, &config);
        let session = w
            .lifecycle
            .start(&admin, &start_request(w.schedule_id))
            .await
            .unwrap();
        // Attribution lands on the schedule's assigned nurse.
        let assigned = w
            .store
            .get_patient_schedule(w.schedule_id)
            .await
            .unwrap()
            .unwrap()
            .nurse_id
            .unwrap();
        assert_eq!(session.recorded_by_nurse_id, assigned);
    }

    #[tokio::test]
    async fn admin_start_without_any_nurse_is_a_validation_error() {
        let w = world().await;
        clear_assigned_nurse(&w).await;
        let config = roles();
        let admin = CallerContext::new(1, Role::Admin, &config);
        let err = w
            .lifecycle
            .start(&admin, &start_request(w.schedule_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)), "got {err:?}");
    }

    async fn clear_assigned_nurse(w: &World) {
        w.store
            .update_patient_schedule(
                w.schedule_id,
                &models::UpdatePatientSchedule {
                    nurse_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn patient_sees_only_own_sessions_in_lists() {
        let w = world().await;
        w.lifecycle
            .start(&w.nurse_ctx, &start_request(w.schedule_id))
            .await
            .unwrap();

        let config = roles();
        let patient =
            CallerContext::new(50, Role::Patient, &config).with_patient(Some(w.patient_id));
        let other = CallerContext::new(51, Role::Patient, &config).with_patient(Some(9_999));

        let (rows, total) = w
            .lifecycle
            .list(&patient, &SessionFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].status, SessionStatus::InProgress);

        // A different patient asking for this patient's rows gets nothing.
        let filter = SessionFilter {
            patient_id: Some(w.patient_id),
            ..Default::default()
        };
        let (_, total) = w.lifecycle.list(&other, &filter).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn cross_patient_detail_read_is_forbidden() {
        let w = world().await;
        let session = w
            .lifecycle
            .start(&w.nurse_ctx, &start_request(w.schedule_id))
            .await
            .unwrap();

        let config = roles();
        let other = CallerContext::new(51, Role::Patient, &config).with_patient(Some(9_999));
        let err = w
            .lifecycle
            .get_detail(&other, session.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)), "got {err:?}");
    }
}
