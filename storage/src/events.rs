// storage/src/events.rs
//
// Complication and medication rows attached to a session. Append-only:
// resolution of a complication is the single permitted mutation.

use chrono::{DateTime, Utc};

use models::{
    ClinicError, ClinicResult, HdSessionComplication, HdSessionMedication, NewComplication,
    NewMedication,
};

use crate::ClinicStore;

impl ClinicStore {
    pub async fn add_complication(
        &self,
        session_id: i64,
        new: &NewComplication,
    ) -> ClinicResult<HdSessionComplication> {
        let now = Utc::now();
        let occurred_at = new.occurred_at.unwrap_or(now);
        let id = sqlx::query(
            "INSERT INTO hd_session_complications \
             (hd_session_id, complication_id, occurred_at, action_taken, notes, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(new.complication_id)
        .bind(occurred_at)
        .bind(&new.action_taken)
        .bind(&new.notes)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_complication(id)
            .await?
            .ok_or_else(|| ClinicError::Storage("created complication vanished".to_string()))
    }

    pub async fn get_complication(&self, id: i64) -> ClinicResult<Option<HdSessionComplication>> {
        let row = sqlx::query_as::<_, HdSessionComplication>(
            "SELECT e.*, c.name AS complication_name FROM hd_session_complications e \
             LEFT JOIN complications c ON c.id = e.complication_id WHERE e.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_complications(
        &self,
        session_id: i64,
    ) -> ClinicResult<Vec<HdSessionComplication>> {
        let rows = sqlx::query_as::<_, HdSessionComplication>(
            "SELECT e.*, c.name AS complication_name FROM hd_session_complications e \
             LEFT JOIN complications c ON c.id = e.complication_id \
             WHERE e.hd_session_id = ? ORDER BY e.occurred_at, e.id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Stamps `resolved_at` on a complication. Refused when already set:
    /// resolution is an event, not an editable field.
    pub async fn resolve_complication(
        &self,
        id: i64,
        resolved_at: DateTime<Utc>,
    ) -> ClinicResult<HdSessionComplication> {
        let current = self
            .get_complication(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("complication".to_string()))?;
        if current.resolved_at.is_some() {
            return Err(ClinicError::InvalidState(
                "complication is already resolved".to_string(),
            ));
        }

        sqlx::query("UPDATE hd_session_complications SET resolved_at = ? WHERE id = ?")
            .bind(resolved_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.get_complication(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("complication".to_string()))
    }

    pub async fn add_medication(
        &self,
        session_id: i64,
        new: &NewMedication,
    ) -> ClinicResult<HdSessionMedication> {
        let now = Utc::now();
        let administered_at = new.administered_at.unwrap_or(now);
        let id = sqlx::query(
            "INSERT INTO hd_session_medications \
             (hd_session_id, medication_id, dosage, route, administered_at, notes, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(new.medication_id)
        .bind(&new.dosage)
        .bind(&new.route)
        .bind(administered_at)
        .bind(&new.notes)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        let row = sqlx::query_as::<_, HdSessionMedication>(
            "SELECT e.*, m.name AS medication_name FROM hd_session_medications e \
             LEFT JOIN medications m ON m.id = e.medication_id WHERE e.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| ClinicError::Storage("created medication vanished".to_string()))
    }

    pub async fn list_medications(
        &self,
        session_id: i64,
    ) -> ClinicResult<Vec<HdSessionMedication>> {
        let rows = sqlx::query_as::<_, HdSessionMedication>(
            "SELECT e.*, m.name AS medication_name FROM hd_session_medications e \
             LEFT JOIN medications m ON m.id = e.medication_id \
             WHERE e.hd_session_id = ? ORDER BY e.administered_at, e.id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::NamedTable;
    use crate::sessions::tests::{fixture, start_request};

    #[tokio::test]
    async fn complication_resolves_exactly_once() {
        let f = fixture().await;
        let session = f
            .store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap();
        let cramp = f
            .store
            .insert_named(NamedTable::Complications, "Muscle cramp")
            .await
            .unwrap();

        let event = f
            .store
            .add_complication(
                session.id,
                &NewComplication {
                    complication_id: cramp,
                    occurred_at: None,
                    action_taken: Some("reduced UF rate".to_string()),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(event.complication_name.as_deref(), Some("Muscle cramp"));
        assert!(event.resolved_at.is_none());

        let resolved = f
            .store
            .resolve_complication(event.id, Utc::now())
            .await
            .unwrap();
        assert!(resolved.resolved_at.is_some());

        let err = f
            .store
            .resolve_complication(event.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidState(_)));
    }

    #[tokio::test]
    async fn medications_list_in_administration_order() {
        let f = fixture().await;
        let session = f
            .store
            .start_session(&start_request(f.schedule_id), f.nurse_id)
            .await
            .unwrap();
        let epo = f
            .store
            .insert_named(NamedTable::Medications, "Erythropoietin")
            .await
            .unwrap();

        let base = Utc::now();
        for (dose, offset) in [("3000 IU", 60), ("1000 IU", 0)] {
            f.store
                .add_medication(
                    session.id,
                    &NewMedication {
                        medication_id: epo,
                        dosage: dose.to_string(),
                        route: "IV".to_string(),
                        administered_at: Some(base + chrono::Duration::minutes(offset)),
                        notes: None,
                    },
                )
                .await
                .unwrap();
        }

        let listed = f.store.list_medications(session.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].dosage, "1000 IU");
        assert_eq!(listed[1].dosage, "3000 IU");
        assert_eq!(listed[0].medication_name.as_deref(), Some("Erythropoietin"));
    }
}
