// clinical/src/events.rs
//
// Intra-session clinical events. New complications and medications can only
// be attached while the session runs; resolving an open complication is the
// one write still allowed after closure.

use chrono::Utc;
use models::{
    ClinicError, ClinicResult, HdSession, HdSessionComplication, HdSessionMedication,
    NewComplication, NewMedication, SessionStatus,
};
use security::{CallerContext, Permission};
use storage::ClinicStore;
use tracing::info;

#[derive(Clone)]
pub struct EventRecorder {
    store: ClinicStore,
}

impl EventRecorder {
    pub fn new(store: ClinicStore) -> Self {
        EventRecorder { store }
    }

    async fn session(&self, id: i64) -> ClinicResult<HdSession> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("session".to_string()))
    }

    async fn running_session(&self, id: i64) -> ClinicResult<HdSession> {
        let session = self.session(id).await?;
        if session.status != SessionStatus::InProgress {
            return Err(ClinicError::InvalidState(format!(
                "session is {}; events can no longer be added",
                session.status
            )));
        }
        Ok(session)
    }

    pub async fn add_complication(
        &self,
        ctx: &CallerContext,
        session_id: i64,
        new: &NewComplication,
    ) -> ClinicResult<HdSessionComplication> {
        ctx.require(Permission::ClinicalEventWrite)?;
        self.running_session(session_id).await?;
        let event = self.store.add_complication(session_id, new).await?;
        info!(session_id, complication_id = event.id, "complication recorded");
        Ok(event)
    }

    pub async fn list_complications(
        &self,
        ctx: &CallerContext,
        session_id: i64,
    ) -> ClinicResult<Vec<HdSessionComplication>> {
        ctx.require(Permission::ClinicalEventRead)?;
        let session = self.session(session_id).await?;
        ctx.ensure_patient_access(session.patient_id)?;
        self.store.list_complications(session_id).await
    }

    /// Marks a complication resolved. Permitted after the session closes so
    /// late outcomes can still be charted.
    pub async fn resolve_complication(
        &self,
        ctx: &CallerContext,
        session_id: i64,
        complication_id: i64,
    ) -> ClinicResult<HdSessionComplication> {
        ctx.require(Permission::ClinicalEventWrite)?;
        let event = self
            .store
            .get_complication(complication_id)
            .await?
            .filter(|c| c.hd_session_id == session_id)
            .ok_or_else(|| ClinicError::NotFound("complication".to_string()))?;
        self.store.resolve_complication(event.id, Utc::now()).await
    }

    pub async fn add_medication(
        &self,
        ctx: &CallerContext,
        session_id: i64,
        new: &NewMedication,
    ) -> ClinicResult<HdSessionMedication> {
        ctx.require(Permission::ClinicalEventWrite)?;
        self.running_session(session_id).await?;
        let event = self.store.add_medication(session_id, new).await?;
        info!(session_id, medication_id = event.id, "medication recorded");
        Ok(event)
    }

    pub async fn list_medications(
        &self,
        ctx: &CallerContext,
        session_id: i64,
    ) -> ClinicResult<Vec<HdSessionMedication>> {
        ctx.require(Permission::ClinicalEventRead)?;
        let session = self.session(session_id).await?;
        ctx.ensure_patient_access(session.patient_id)?;
        self.store.list_medications(session_id).await
    }
}
