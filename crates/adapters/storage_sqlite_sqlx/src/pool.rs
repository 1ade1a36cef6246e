//! Opening the settings database.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::StorageError;

/// Settings writes are already serialized by the store, one connection
/// is all the daemon needs.
const MAX_CONNECTIONS: u32 = 1;

/// How long a statement waits on a locked database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the settings database lives.
pub struct Config {
    /// `SQLite` URL, e.g. `sqlite:carhub.db?mode=rwc` or `sqlite::memory:`.
    pub database_url: String,
}

impl Config {
    /// Open the database, creating the file if needed, and migrate it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] for an invalid URL, an unreachable file or
    /// a failed migration.
    pub async fn build(self) -> Result<Database, StorageError> {
        let options = SqliteConnectOptions::from_str(&self.database_url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(url = %self.database_url, "settings database ready");

        Ok(Database { pool })
    }
}

/// An open, migrated settings database.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for in-flight statements and close the connection.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("settings database closed");
    }
}
