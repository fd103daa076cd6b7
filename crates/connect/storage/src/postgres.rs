//! PostgreSQL adapter for the connection store.
//!
//! The aggregate is persisted as one JSONB document beside denormalized
//! columns for the query paths (party profiles, last status change) and an
//! integer version column for the optimistic guard. `save` is a single
//! conditional `UPDATE ... WHERE version = $n`, so the version check and the
//! write are one atomic statement and a losing racer changes nothing.

use crate::traits::{ConnectionStore, QueryWindow};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use connect_types::{ConnectionId, ProfileId};
use connect_workflow::Connection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

/// PostgreSQL-backed connection store.
#[derive(Clone)]
pub struct PostgresConnectionStore {
    pool: PgPool,
}

impl PostgresConnectionStore {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS connect_connections (
                connection_id TEXT PRIMARY KEY,
                buyer_profile_id TEXT NOT NULL,
                supplier_profile_id TEXT NOT NULL,
                document JSONB NOT NULL,
                version BIGINT NOT NULL,
                last_status_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS connect_connections_buyer_idx
                ON connect_connections (buyer_profile_id, last_status_at DESC)
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS connect_connections_supplier_idx
                ON connect_connections (supplier_profile_id, last_status_at DESC)
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionStore for PostgresConnectionStore {
    async fn insert(&self, connection: Connection) -> StorageResult<()> {
        let document = serde_json::to_value(&connection)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO connect_connections
                (connection_id, buyer_profile_id, supplier_profile_id, document, version, last_status_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(connection.id().as_str())
        .bind(connection.buyer_profile_id().as_str())
        .bind(connection.supplier_profile_id().as_str())
        .bind(document)
        .bind(to_i64(connection.version())?)
        .bind(connection.last_status_at())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;

        Ok(())
    }

    async fn load(&self, id: &ConnectionId) -> StorageResult<Option<Connection>> {
        let row = sqlx::query(
            "SELECT document FROM connect_connections WHERE connection_id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        row.map(row_to_connection).transpose()
    }

    async fn save(&self, connection: Connection, expected_version: u64) -> StorageResult<u64> {
        let document = serde_json::to_value(&connection)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE connect_connections
               SET document = $1,
                   version = $2,
                   last_status_at = $3
             WHERE connection_id = $4
               AND version = $5
            "#,
        )
        .bind(document)
        .bind(to_i64(connection.version())?)
        .bind(connection.last_status_at())
        .bind(connection.id().as_str())
        .bind(to_i64(expected_version)?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            let exists = self.load(connection.id()).await?.is_some();
            if exists {
                return Err(StorageError::Conflict(format!(
                    "connection {}: version {} no longer current",
                    connection.id(),
                    expected_version
                )));
            }
            return Err(StorageError::NotFound(format!(
                "connection {} not found",
                connection.id()
            )));
        }

        Ok(connection.version())
    }

    async fn list_for_profile(
        &self,
        profile: &ProfileId,
        window: QueryWindow,
    ) -> StorageResult<Vec<Connection>> {
        let rows = if window.limit == 0 {
            sqlx::query(
                r#"
                SELECT document FROM connect_connections
                 WHERE buyer_profile_id = $1 OR supplier_profile_id = $1
                 ORDER BY last_status_at DESC
                 OFFSET $2
                "#,
            )
            .bind(profile.as_str())
            .bind(to_i64_usize(window.offset)?)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                SELECT document FROM connect_connections
                 WHERE buyer_profile_id = $1 OR supplier_profile_id = $1
                 ORDER BY last_status_at DESC
                 LIMIT $2 OFFSET $3
                "#,
            )
            .bind(profile.as_str())
            .bind(to_i64_usize(window.limit)?)
            .bind(to_i64_usize(window.offset)?)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(row_to_connection).collect()
    }

    async fn list_recent(&self, window: QueryWindow) -> StorageResult<Vec<Connection>> {
        let rows = if window.limit == 0 {
            sqlx::query(
                r#"
                SELECT document FROM connect_connections
                 ORDER BY last_status_at DESC
                 OFFSET $1
                "#,
            )
            .bind(to_i64_usize(window.offset)?)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                SELECT document FROM connect_connections
                 ORDER BY last_status_at DESC
                 LIMIT $1 OFFSET $2
                "#,
            )
            .bind(to_i64_usize(window.limit)?)
            .bind(to_i64_usize(window.offset)?)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(row_to_connection).collect()
    }
}

fn row_to_connection(row: sqlx::postgres::PgRow) -> StorageResult<Connection> {
    let document: serde_json::Value = row
        .try_get("document")
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    serde_json::from_value(document).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn map_sqlx_conflict(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StorageError::Conflict(db_err.message().to_string());
        }
    }
    StorageError::Backend(err.to_string())
}

fn to_i64(value: u64) -> StorageResult<i64> {
    i64::try_from(value).map_err(|_| StorageError::InvalidInput("version too large".to_string()))
}

fn to_i64_usize(value: usize) -> StorageResult<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::InvalidInput("window value too large".to_string()))
}
