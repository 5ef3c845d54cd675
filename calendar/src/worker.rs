// calendar/src/worker.rs
//
// Reconciliation worker. Pushes schedule slots to the owner's external
// calendar, one item at a time: a mapping row means update, no mapping means
// create. Item failures are counted and logged, never fatal to the batch;
// a token that cannot be made usable aborts before any item runs.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{info, warn};

use models::{
    CalendarAuthToken, ClinicError, ClinicResult, ScheduleType, SyncReport, ValidationError,
};
use storage::{ClinicStore, SyncItem};

use crate::google::{CalendarApi, EventPayload};

const DEFAULT_RANGE_DAYS: i64 = 30;

/// What `GET /google/sync` reports.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    pub calendar_id: Option<String>,
    pub synced_events: i64,
}

pub struct ReconciliationWorker {
    store: ClinicStore,
    api: Arc<dyn CalendarApi>,
}

impl ReconciliationWorker {
    pub fn new(store: ClinicStore, api: Arc<dyn CalendarApi>) -> Self {
        ReconciliationWorker { store, api }
    }

    pub async fn connection_status(&self, user_id: i64) -> ClinicResult<ConnectionStatus> {
        let token = self.store.get_auth_token(user_id).await?;
        let synced_events = self.store.list_sync_mappings(user_id).await?.len() as i64;
        Ok(ConnectionStatus {
            connected: token.is_some(),
            calendar_id: token.map(|t| t.calendar_id),
            synced_events,
        })
    }

    /// Pushes every schedule of `schedule_type` in the date range to the
    /// user's calendar. Bounds default to today .. today + 30 days.
    pub async fn sync_range(
        &self,
        user_id: i64,
        schedule_type: ScheduleType,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ClinicResult<SyncReport> {
        let token = self
            .store
            .get_auth_token(user_id)
            .await?
            .ok_or(ClinicError::NotConnected)?;
        let access_token = self.usable_access_token(&token).await?;

        let today = Utc::now().date_naive();
        let start = start.unwrap_or(today);
        let end = end.unwrap_or(start + Duration::days(DEFAULT_RANGE_DAYS));
        if end < start {
            return Err(ValidationError::InvertedRange("endDate").into());
        }

        let items = self
            .store
            .sync_items(user_id, schedule_type, start, end)
            .await?;

        let mut report = SyncReport::default();
        for item in items {
            match self
                .push_item(user_id, schedule_type, &token, &access_token, &item)
                .await
            {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    warn!(
                        user_id,
                        schedule_id = item.schedule_id,
                        error = %e,
                        "calendar push failed"
                    );
                    report.errors += 1;
                }
            }
        }
        info!(
            user_id,
            schedule_type = %schedule_type,
            synced = report.synced,
            errors = report.errors,
            "calendar reconciliation finished"
        );
        Ok(report)
    }

    /// Removes the stored credential and every mapping row. Events already
    /// pushed stay on the external calendar.
    pub async fn disconnect(&self, user_id: i64) -> ClinicResult<()> {
        let deleted = self.store.delete_sync_mappings(user_id).await?;
        self.store.delete_auth_token(user_id).await?;
        info!(user_id, mappings = deleted, "calendar disconnected");
        Ok(())
    }

    /// An access token the API will accept, refreshing through the stored
    /// refresh token when the current one has expired. A credential that
    /// cannot be refreshed fails the whole batch up front.
    async fn usable_access_token(&self, token: &CalendarAuthToken) -> ClinicResult<String> {
        let expired = token.expires_at.is_some_and(|at| at <= Utc::now());
        if !expired {
            return Ok(token.access_token.clone());
        }
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(ClinicError::NotConnected)?;
        let refreshed = self.api.refresh_access_token(refresh_token).await?;
        self.store
            .update_access_token(token.user_id, &refreshed.access_token, refreshed.expires_at())
            .await?;
        Ok(refreshed.access_token)
    }

    async fn push_item(
        &self,
        user_id: i64,
        schedule_type: ScheduleType,
        token: &CalendarAuthToken,
        access_token: &str,
        item: &SyncItem,
    ) -> ClinicResult<()> {
        let payload = event_payload(schedule_type, item);
        let mapping = self
            .store
            .get_sync_mapping(user_id, schedule_type, item.schedule_id)
            .await?;

        let event_id = match &mapping {
            Some(mapping) => {
                self.api
                    .update_event(
                        access_token,
                        &token.calendar_id,
                        &mapping.external_event_id,
                        &payload,
                    )
                    .await?
            }
            None => {
                self.api
                    .create_event(access_token, &token.calendar_id, &payload)
                    .await?
            }
        };

        self.store
            .record_sync(user_id, schedule_type, item.schedule_id, &event_id)
            .await
    }
}

fn event_payload(schedule_type: ScheduleType, item: &SyncItem) -> EventPayload {
    let summary = match schedule_type {
        ScheduleType::Patient => format!("Hemodialysis session ({})", item.shift_name),
        ScheduleType::Nurse => format!("Clinic shift ({})", item.shift_name),
    };
    let mut description = format!("Status: {}", item.status);
    if let Some(room) = &item.room_name {
        description.push_str(&format!("\nRoom: {}", room));
    }
    EventPayload {
        summary,
        description,
        date: item.schedule_date,
        start_time: item.shift_start.clone(),
        end_time: item.shift_end.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use models::NewNurseSchedule;
    use std::sync::Mutex;

    use crate::google::TokenResponse;

    #[derive(Default)]
    struct MockApi {
        created: Mutex<Vec<EventPayload>>,
        updated: Mutex<Vec<(String, EventPayload)>>,
        refreshes: Mutex<u32>,
        /// Summaries whose pushes should fail.
        fail_matching: Option<String>,
    }

    #[async_trait]
    impl CalendarApi for MockApi {
        async fn create_event(
            &self,
            _access_token: &str,
            _calendar_id: &str,
            event: &EventPayload,
        ) -> ClinicResult<String> {
            if let Some(needle) = &self.fail_matching {
                if event.description.contains(needle.as_str()) {
                    return Err(ClinicError::External("boom".to_string()));
                }
            }
            let mut created = self.created.lock().unwrap();
            created.push(event.clone());
            Ok(format!("evt-{}", created.len()))
        }

        async fn update_event(
            &self,
            _access_token: &str,
            _calendar_id: &str,
            event_id: &str,
            event: &EventPayload,
        ) -> ClinicResult<String> {
            self.updated
                .lock()
                .unwrap()
                .push((event_id.to_string(), event.clone()));
            Ok(event_id.to_string())
        }

        async fn refresh_access_token(&self, _refresh_token: &str) -> ClinicResult<TokenResponse> {
            *self.refreshes.lock().unwrap() += 1;
            Ok(TokenResponse {
                access_token: "fresh".to_string(),
                refresh_token: None,
                expires_in: Some(3600),
            })
        }
    }

    struct World {
        store: ClinicStore,
        user_id: i64,
    }

    async fn world(schedule_days: &[&str]) -> World {
        let store = ClinicStore::in_memory().await.unwrap();
        let user_id = store.insert_user("nurse.sari", 3).await.unwrap();
        let nurse_id = store
            .insert_nurse(Some(user_id), "Sari", "Wijaya")
            .await
            .unwrap();
        let shift_id = store
            .insert_shift("Morning", "07:00", "12:00")
            .await
            .unwrap();
        for day in schedule_days {
            store
                .create_nurse_schedule(&NewNurseSchedule {
                    nurse_id,
                    shift_id,
                    schedule_date: day.parse().unwrap(),
                    room_id: None,
                    status: None,
                    notes: None,
                })
                .await
                .unwrap();
        }
        World { store, user_id }
    }

    fn range() -> (Option<NaiveDate>, Option<NaiveDate>) {
        (
            Some("2024-01-01".parse().unwrap()),
            Some("2024-01-31".parse().unwrap()),
        )
    }

    #[tokio::test]
    async fn missing_token_is_not_connected() {
        let w = world(&[]).await;
        let worker = ReconciliationWorker::new(w.store.clone(), Arc::new(MockApi::default()));
        let (start, end) = range();
        let err = worker
            .sync_range(w.user_id, ScheduleType::Nurse, start, end)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::NotConnected));
    }

    #[tokio::test]
    async fn second_sync_updates_instead_of_duplicating() {
        let w = world(&["2024-01-10", "2024-01-12"]).await;
        w.store
            .upsert_auth_token(w.user_id, "at", Some("rt"), None, "primary")
            .await
            .unwrap();
        let api = Arc::new(MockApi::default());
        let worker = ReconciliationWorker::new(w.store.clone(), api.clone());
        let (start, end) = range();

        let first = worker
            .sync_range(w.user_id, ScheduleType::Nurse, start, end)
            .await
            .unwrap();
        assert_eq!(first.synced, 2);
        assert_eq!(first.errors, 0);

        let second = worker
            .sync_range(w.user_id, ScheduleType::Nurse, start, end)
            .await
            .unwrap();
        assert_eq!(second.synced, 2);

        assert_eq!(api.created.lock().unwrap().len(), 2);
        assert_eq!(api.updated.lock().unwrap().len(), 2);
        let mappings = w.store.list_sync_mappings(w.user_id).await.unwrap();
        assert_eq!(mappings.len(), 2);
    }

    #[tokio::test]
    async fn item_failures_are_counted_not_fatal() {
        let w = world(&["2024-01-10"]).await;
        // Second schedule in a named room; the mock fails pushes for it.
        let nurse_id = w
            .store
            .nurse_id_for_user(w.user_id)
            .await
            .unwrap()
            .unwrap();
        let shift_id = w.store.insert_shift("Evening", "13:00", "18:00").await.unwrap();
        let room_id = w
            .store
            .insert_named(storage::NamedTable::Rooms, "HD-9")
            .await
            .unwrap();
        w.store
            .create_nurse_schedule(&NewNurseSchedule {
                nurse_id,
                shift_id,
                schedule_date: "2024-01-11".parse().unwrap(),
                room_id: Some(room_id),
                status: None,
                notes: None,
            })
            .await
            .unwrap();
        w.store
            .upsert_auth_token(w.user_id, "at", Some("rt"), None, "primary")
            .await
            .unwrap();

        let api = Arc::new(MockApi {
            fail_matching: Some("HD-9".to_string()),
            ..Default::default()
        });
        let worker = ReconciliationWorker::new(w.store.clone(), api);
        let (start, end) = range();
        let report = worker
            .sync_range(w.user_id, ScheduleType::Nurse, start, end)
            .await
            .unwrap();
        assert_eq!(report.synced, 1);
        assert_eq!(report.errors, 1);

        // Only the successful push got a mapping.
        assert_eq!(w.store.list_sync_mappings(w.user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once_per_batch() {
        let w = world(&["2024-01-10", "2024-01-12"]).await;
        let past = Utc::now() - Duration::hours(1);
        w.store
            .upsert_auth_token(w.user_id, "stale", Some("rt"), Some(past), "primary")
            .await
            .unwrap();
        let api = Arc::new(MockApi::default());
        let worker = ReconciliationWorker::new(w.store.clone(), api.clone());
        let (start, end) = range();

        let report = worker
            .sync_range(w.user_id, ScheduleType::Nurse, start, end)
            .await
            .unwrap();
        assert_eq!(report.synced, 2);
        assert_eq!(*api.refreshes.lock().unwrap(), 1);

        let stored = w.store.get_auth_token(w.user_id).await.unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh");
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let w = world(&[]).await;
        w.store
            .upsert_auth_token(w.user_id, "at", None, None, "primary")
            .await
            .unwrap();
        let worker = ReconciliationWorker::new(w.store.clone(), Arc::new(MockApi::default()));
        let err = worker
            .sync_range(
                w.user_id,
                ScheduleType::Nurse,
                Some("2024-01-31".parse().unwrap()),
                Some("2024-01-01".parse().unwrap()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
    }

    #[tokio::test]
    async fn disconnect_forgets_credential_and_mappings() {
        let w = world(&["2024-01-10"]).await;
        w.store
            .upsert_auth_token(w.user_id, "at", Some("rt"), None, "primary")
            .await
            .unwrap();
        let worker = ReconciliationWorker::new(w.store.clone(), Arc::new(MockApi::default()));
        let (start, end) = range();
        worker
            .sync_range(w.user_id, ScheduleType::Nurse, start, end)
            .await
            .unwrap();

        worker.disconnect(w.user_id).await.unwrap();

        let status = worker.connection_status(w.user_id).await.unwrap();
        assert!(!status.connected);
        assert_eq!(status.synced_events, 0);
    }
}
