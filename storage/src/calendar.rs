// storage/src/calendar.rs
//
// Persistence behind calendar reconciliation: the per-user OAuth credential
// and the mapping rows that keep external pushes idempotent.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, QueryBuilder};

use models::{CalendarAuthToken, CalendarSyncMapping, ClinicResult, ScheduleType};

use crate::ClinicStore;

/// One schedule row flattened for reconciliation: ids plus the
/// human-readable fields the external event is built from.
#[derive(Debug, Clone, FromRow)]
pub struct SyncItem {
    pub schedule_id: i64,
    pub schedule_date: NaiveDate,
    pub shift_name: String,
    pub shift_start: String,
    pub shift_end: String,
    pub room_name: Option<String>,
    pub status: String,
}

impl ClinicStore {
    // --- Auth tokens ---

    pub async fn upsert_auth_token(
        &self,
        user_id: i64,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        calendar_id: &str,
    ) -> ClinicResult<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO calendar_auth_tokens \
             (user_id, access_token, refresh_token, expires_at, calendar_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id) DO UPDATE SET \
             access_token = excluded.access_token, \
             refresh_token = COALESCE(excluded.refresh_token, refresh_token), \
             expires_at = excluded.expires_at, \
             calendar_id = excluded.calendar_id, \
             updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(calendar_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_auth_token(&self, user_id: i64) -> ClinicResult<Option<CalendarAuthToken>> {
        let row = sqlx::query_as::<_, CalendarAuthToken>(
            "SELECT * FROM calendar_auth_tokens WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Stores a refreshed access token without touching the refresh token.
    pub async fn update_access_token(
        &self,
        user_id: i64,
        access_token: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> ClinicResult<()> {
        sqlx::query(
            "UPDATE calendar_auth_tokens SET access_token = ?, expires_at = ?, updated_at = ? \
             WHERE user_id = ?",
        )
        .bind(access_token)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_auth_token(&self, user_id: i64) -> ClinicResult<()> {
        sqlx::query("DELETE FROM calendar_auth_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- Sync mappings ---

    pub async fn get_sync_mapping(
        &self,
        user_id: i64,
        schedule_type: ScheduleType,
        schedule_id: i64,
    ) -> ClinicResult<Option<CalendarSyncMapping>> {
        let row = sqlx::query_as::<_, CalendarSyncMapping>(
            "SELECT * FROM calendar_sync_mappings \
             WHERE user_id = ? AND schedule_type = ? AND schedule_id = ?",
        )
        .bind(user_id)
        .bind(schedule_type)
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Records a successful push. Insert-or-update on the composite key, so
    /// repeated syncs never grow a second row for the same schedule.
    pub async fn record_sync(
        &self,
        user_id: i64,
        schedule_type: ScheduleType,
        schedule_id: i64,
        external_event_id: &str,
    ) -> ClinicResult<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO calendar_sync_mappings \
             (user_id, schedule_type, schedule_id, external_event_id, last_synced_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, schedule_type, schedule_id) DO UPDATE SET \
             external_event_id = excluded.external_event_id, \
             last_synced_at = excluded.last_synced_at",
        )
        .bind(user_id)
        .bind(schedule_type)
        .bind(schedule_id)
        .bind(external_event_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_sync_mappings(&self, user_id: i64) -> ClinicResult<Vec<CalendarSyncMapping>> {
        let rows = sqlx::query_as::<_, CalendarSyncMapping>(
            "SELECT * FROM calendar_sync_mappings WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete_sync_mappings(&self, user_id: i64) -> ClinicResult<u64> {
        let result = sqlx::query("DELETE FROM calendar_sync_mappings WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Schedules of one actor kind within a date range, joined with the
    /// display fields the external event title/description are built from.
    /// The actor is resolved from the calendar owner's linked profile.
    pub async fn sync_items(
        &self,
        user_id: i64,
        schedule_type: ScheduleType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClinicResult<Vec<SyncItem>> {
        let mut builder = match schedule_type {
            ScheduleType::Patient => QueryBuilder::new(
                "SELECT ps.id AS schedule_id, ps.schedule_date, sh.name AS shift_name, \
                 sh.start_time AS shift_start, sh.end_time AS shift_end, \
                 r.name AS room_name, ps.status \
                 FROM patient_schedules ps \
                 JOIN shifts sh ON sh.id = ps.shift_id \
                 LEFT JOIN rooms r ON r.id = ps.room_id \
                 JOIN patients p ON p.id = ps.patient_id \
                 WHERE p.user_id = ",
            ),
            ScheduleType::Nurse => QueryBuilder::new(
                "SELECT ns.id AS schedule_id, ns.schedule_date, sh.name AS shift_name, \
                 sh.start_time AS shift_start, sh.end_time AS shift_end, \
                 r.name AS room_name, ns.status \
                 FROM nurse_schedules ns \
                 JOIN shifts sh ON sh.id = ns.shift_id \
                 LEFT JOIN rooms r ON r.id = ns.room_id \
                 JOIN nurses n ON n.id = ns.nurse_id \
                 WHERE n.user_id = ",
            ),
        };
        builder.push_bind(user_id);
        builder.push(" AND schedule_date >= ").push_bind(start);
        builder.push(" AND schedule_date <= ").push_bind(end);
        builder.push(" ORDER BY schedule_date, schedule_id");

        let rows = builder
            .build_query_as::<SyncItem>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
