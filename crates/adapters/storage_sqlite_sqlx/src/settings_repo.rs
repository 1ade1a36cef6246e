//! `SQLite` implementation of [`Persistence`] for the Settings store.
//!
//! One row per topic; the value is stored as JSON text so its type
//! survives a restart.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use carhub_app::ports::Persistence;
use carhub_domain::error::CarHubError;
use carhub_domain::time::{now, to_column};
use carhub_domain::topic::Topic;
use carhub_domain::value::Value;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain types.
struct Wrapper((Topic, Value));

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let topic: String = row.try_get("topic")?;
        let value_json: String = row.try_get("value")?;

        let value: Value =
            serde_json::from_str(&value_json).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self((Topic::new(topic), value)))
    }
}

const UPSERT: &str = r"
    INSERT INTO settings (topic, value, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(topic) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
";

const SELECT_ALL: &str = "SELECT topic, value FROM settings ORDER BY topic";

/// `SQLite`-backed settings repository.
#[derive(Clone)]
pub struct SqliteSettingsRepository {
    pool: SqlitePool,
}

impl SqliteSettingsRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl Persistence for SqliteSettingsRepository {
    /// Rows that fail to decode are skipped with a warning.
    async fn load_all(&self) -> Result<Vec<(Topic, Value)>, CarHubError> {
        let rows: Vec<SqliteRow> = sqlx::query(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows
            .iter()
            .filter_map(|row| match Wrapper::from_row(row) {
                Ok(Wrapper(entry)) => Some(entry),
                Err(err) => {
                    let topic: Option<String> = row.try_get("topic").ok();
                    tracing::warn!(?topic, error = %err, "skipping undecodable setting");
                    None
                }
            })
            .collect())
    }

    async fn save(&self, topic: &Topic, value: &Value) -> Result<(), CarHubError> {
        let value_json = serde_json::to_string(value).map_err(StorageError::from)?;

        sqlx::query(UPSERT)
            .bind(topic.as_str())
            .bind(&value_json)
            .bind(to_column(now()))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteSettingsRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteSettingsRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn should_return_empty_when_nothing_saved() {
        let repo = setup().await;
        assert!(repo.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_save_and_load_values_with_their_types() {
        let repo = setup().await;

        repo.save(&Topic::new("components.usb_hub"), &Value::from("auto"))
            .await
            .unwrap();
        repo.save(&Topic::new("mqtt.enabled"), &Value::Bool(true))
            .await
            .unwrap();
        repo.save(&Topic::new("serial.retry_ms"), &Value::Int(200))
            .await
            .unwrap();

        let loaded = repo.load_all().await.unwrap();
        assert_eq!(
            loaded,
            vec![
                (Topic::new("components.usb_hub"), Value::from("auto")),
                (Topic::new("mqtt.enabled"), Value::Bool(true)),
                (Topic::new("serial.retry_ms"), Value::Int(200)),
            ]
        );
    }

    #[tokio::test]
    async fn should_overwrite_existing_topic() {
        let repo = setup().await;
        let topic = Topic::new("components.angel_eyes");

        repo.save(&topic, &Value::from("on")).await.unwrap();
        repo.save(&topic, &Value::from("off")).await.unwrap();

        let loaded = repo.load_all().await.unwrap();
        assert_eq!(loaded, vec![(topic, Value::from("off"))]);
    }

    #[tokio::test]
    async fn should_be_durable() {
        let repo = setup().await;
        assert!(repo.is_durable());
    }

    #[tokio::test]
    async fn should_skip_corrupt_row_and_load_the_rest() {
        let repo = setup().await;
        repo.save(&Topic::new("mqtt.enabled"), &Value::Bool(true))
            .await
            .unwrap();
        sqlx::query("INSERT INTO settings (topic, value, updated_at) VALUES ('broken', '{nope', '')")
            .execute(&repo.pool)
            .await
            .unwrap();

        let loaded = repo.load_all().await.unwrap();
        assert_eq!(loaded, vec![(Topic::new("mqtt.enabled"), Value::Bool(true))]);
    }
}
