//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CollectionStore` port from the `core` crate. Every collection lives in a
//! single row of the `collections` table in PostgreSQL, accessed through `sqlx`.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use yourroom_core::ports::{CollectionStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CollectionStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CollectionRecord {
    value: String,
}

//=========================================================================================
// `CollectionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CollectionStore for DbAdapter {
    async fn read(&self, key: &str) -> PortResult<Option<String>> {
        let record = sqlx::query_as::<_, CollectionRecord>(
            "SELECT value FROM collections WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(|r| r.value))
    }

    /// Upserts the whole collection in a single statement, so the row is always
    /// either the previous or the new value.
    async fn write(&self, key: &str, value: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO collections (key, value, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
