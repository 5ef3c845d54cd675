// storage/src/lib.rs
//
// The clinical record store. A thin wrapper over a SQLite pool; each
// aggregate gets its own repository module, and the session lifecycle
// primitives run schedule + session writes inside one transaction.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use models::ClinicResult;

pub mod calendar;
pub mod events;
pub mod reference;
pub mod schedules;
pub mod sessions;

pub use calendar::SyncItem;
pub use reference::NamedTable;

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Clone)]
pub struct ClinicStore {
    pool: SqlitePool,
}

impl ClinicStore {
    /// Opens (creating if needed) the database at `url` and applies the
    /// schema. `url` is a sqlite connection string, e.g.
    /// `sqlite://clinic.db`.
    pub async fn connect(url: &str) -> ClinicResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = ClinicStore { pool };
        store.apply_schema().await?;
        info!(url, "clinical record store ready");
        Ok(store)
    }

    /// An in-memory store, used by tests and local experiments. Pinned to a
    /// single connection so every query sees the same database.
    pub async fn in_memory() -> ClinicResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = ClinicStore { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    async fn apply_schema(&self) -> ClinicResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
