// clinical/src/schedules.rs
//
// Booking service for both schedule kinds. Permission gates and patient
// row scoping happen here; uniqueness is enforced by storage constraints
// and surfaces as `Conflict`.

use models::{
    ClinicError, ClinicResult, NewNurseSchedule, NewPatientSchedule, NurseSchedule,
    PatientSchedule, ScheduleFilter, UpdateNurseSchedule, UpdatePatientSchedule,
};
use security::{CallerContext, Permission, Role};
use storage::ClinicStore;
use tracing::info;

#[derive(Clone)]
pub struct ScheduleManager {
    store: ClinicStore,
}

impl ScheduleManager {
    pub fn new(store: ClinicStore) -> Self {
        ScheduleManager { store }
    }

    fn patient_scope(&self, ctx: &CallerContext) -> ClinicResult<Option<i64>> {
        if ctx.role == Role::Patient {
            Ok(Some(ctx.own_patient_id()?))
        } else {
            Ok(None)
        }
    }

    // --- Patient schedules ---

    pub async fn create_patient_schedule(
        &self,
        ctx: &CallerContext,
        new: &NewPatientSchedule,
    ) -> ClinicResult<PatientSchedule> {
        ctx.require(Permission::PatientScheduleCreate)?;
        let schedule = self.store.create_patient_schedule(new).await?;
        info!(
            schedule_id = schedule.id,
            patient_id = schedule.patient_id,
            date = %schedule.schedule_date,
            "patient schedule created"
        );
        Ok(schedule)
    }

    pub async fn get_patient_schedule(
        &self,
        ctx: &CallerContext,
        id: i64,
    ) -> ClinicResult<PatientSchedule> {
        ctx.require(Permission::PatientScheduleRead)?;
        let schedule = self
            .store
            .get_patient_schedule(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("patient schedule".to_string()))?;
        ctx.ensure_patient_access(schedule.patient_id)?;
        Ok(schedule)
    }

    pub async fn list_patient_schedules(
        &self,
        ctx: &CallerContext,
        filter: &ScheduleFilter,
    ) -> ClinicResult<(Vec<PatientSchedule>, i64)> {
        ctx.require(Permission::PatientScheduleRead)?;
        let scope = self.patient_scope(ctx)?;
        self.store.list_patient_schedules(filter, scope).await
    }

    pub async fn update_patient_schedule(
        &self,
        ctx: &CallerContext,
        id: i64,
        patch: &UpdatePatientSchedule,
    ) -> ClinicResult<PatientSchedule> {
        ctx.require(Permission::PatientScheduleUpdate)?;
        self.store.update_patient_schedule(id, patch).await
    }

    /// Deletes a booking. Refused once a session row references the slot:
    /// clinical records are never cascaded away by a scheduling action.
    pub async fn delete_patient_schedule(&self, ctx: &CallerContext, id: i64) -> ClinicResult<()> {
        ctx.require(Permission::PatientScheduleDelete)?;
        self.store
            .get_patient_schedule(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("patient schedule".to_string()))?;
        if self.store.schedule_has_session(id).await? {
            return Err(ClinicError::Conflict(
                "schedule has a recorded session; delete the session first".to_string(),
            ));
        }
        self.store.delete_patient_schedule(id).await?;
        info!(schedule_id = id, "patient schedule deleted");
        Ok(())
    }

    // --- Nurse schedules ---

    pub async fn create_nurse_schedule(
        &self,
        ctx: &CallerContext,
        new: &NewNurseSchedule,
    ) -> ClinicResult<NurseSchedule> {
        ctx.require(Permission::NurseScheduleCreate)?;
        let schedule = self.store.create_nurse_schedule(new).await?;
        info!(
            schedule_id = schedule.id,
            nurse_id = schedule.nurse_id,
            date = %schedule.schedule_date,
            "nurse schedule created"
        );
        Ok(schedule)
    }

    pub async fn get_nurse_schedule(
        &self,
        ctx: &CallerContext,
        id: i64,
    ) -> ClinicResult<NurseSchedule> {
        ctx.require(Permission::NurseScheduleRead)?;
        self.store
            .get_nurse_schedule(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("nurse schedule".to_string()))
    }

    pub async fn list_nurse_schedules(
        &self,
        ctx: &CallerContext,
        filter: &ScheduleFilter,
    ) -> ClinicResult<(Vec<NurseSchedule>, i64)> {
        ctx.require(Permission::NurseScheduleRead)?;
        self.store.list_nurse_schedules(filter).await
    }

    pub async fn update_nurse_schedule(
        &self,
        ctx: &CallerContext,
        id: i64,
        patch: &UpdateNurseSchedule,
    ) -> ClinicResult<NurseSchedule> {
        ctx.require(Permission::NurseScheduleUpdate)?;
        self.store.update_nurse_schedule(id, patch).await
    }

    pub async fn delete_nurse_schedule(&self, ctx: &CallerContext, id: i64) -> ClinicResult<()> {
        ctx.require(Permission::NurseScheduleDelete)?;
        self.store.delete_nurse_schedule(id).await
    }
}
