// storage/src/reference.rs
//
// Master-data lookups the core consumes but does not own: account-to-profile
// resolution and minimal inserts for seeding reference rows.

use models::ClinicResult;

use crate::ClinicStore;

impl ClinicStore {
    /// Patient record linked to a user account, if any.
    pub async fn patient_id_for_user(&self, user_id: i64) -> ClinicResult<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM patients WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// Nurse profile linked to a user account, if any.
    pub async fn nurse_id_for_user(&self, user_id: i64) -> ClinicResult<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM nurses WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn insert_user(&self, username: &str, role_id: u32) -> ClinicResult<i64> {
        let id = sqlx::query("INSERT INTO users (username, role_id) VALUES (?, ?)")
            .bind(username)
            .bind(role_id as i64)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    pub async fn insert_patient(
        &self,
        user_id: Option<i64>,
        first_name: &str,
        last_name: &str,
    ) -> ClinicResult<i64> {
        let id = sqlx::query("INSERT INTO patients (user_id, first_name, last_name) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(first_name)
            .bind(last_name)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    pub async fn insert_nurse(
        &self,
        user_id: Option<i64>,
        first_name: &str,
        last_name: &str,
    ) -> ClinicResult<i64> {
        let id = sqlx::query("INSERT INTO nurses (user_id, first_name, last_name) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(first_name)
            .bind(last_name)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    pub async fn insert_shift(
        &self,
        name: &str,
        start_time: &str,
        end_time: &str,
    ) -> ClinicResult<i64> {
        let id = sqlx::query("INSERT INTO shifts (name, start_time, end_time) VALUES (?, ?, ?)")
            .bind(name)
            .bind(start_time)
            .bind(end_time)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    pub async fn insert_named(&self, table: NamedTable, name: &str) -> ClinicResult<i64> {
        let sql = match table {
            NamedTable::Rooms => "INSERT INTO rooms (name) VALUES (?)",
            NamedTable::Machines => "INSERT INTO machines (name) VALUES (?)",
            NamedTable::Protocols => "INSERT INTO protocols (name) VALUES (?)",
            NamedTable::Complications => "INSERT INTO complications (name) VALUES (?)",
            NamedTable::Medications => "INSERT INTO medications (name) VALUES (?)",
        };
        let id = sqlx::query(sql)
            .bind(name)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }
}

/// Simple name-only reference tables.
#[derive(Debug, Clone, Copy)]
pub enum NamedTable {
    Rooms,
    Machines,
    Protocols,
    Complications,
    Medications,
}
