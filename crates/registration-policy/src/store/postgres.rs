//! PostgreSQL policy store implementation

use super::traits::PolicyStore;
use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::model::{ParameterRecord, ParameterTypeRecord};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::sync::Arc;

const PARAMETER_COLUMNS: &str =
    "id, type_id, key, description, value, active, created_at, updated_at";
const TYPE_COLUMNS: &str = "id, key, description, active, created_at, updated_at";

/// PostgreSQL-backed policy store.
///
/// The partial unique index on `parameter(key) WHERE active` enforces the
/// one-active-record-per-key invariant; upserts rely on it through
/// `ON CONFLICT`.
#[derive(Clone)]
pub struct PostgresPolicyStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresPolicyStore {
    /// Wrap an existing pool and initialize schema
    pub async fn from_pool(pool: PgPool) -> StoreResult<Self> {
        let store = Self {
            pool,
            clock: Arc::new(SystemClock),
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> StoreResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS parameter_type (
                id BIGSERIAL PRIMARY KEY,
                key TEXT NOT NULL UNIQUE,
                description TEXT,
                active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS parameter (
                id BIGSERIAL PRIMARY KEY,
                type_id BIGINT NOT NULL REFERENCES parameter_type(id),
                key TEXT NOT NULL,
                description TEXT,
                value TEXT NOT NULL,
                active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE UNIQUE INDEX IF NOT EXISTS parameter_active_key ON parameter(key) WHERE active;"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(classify)?;
        }

        Ok(())
    }
}

/// Map a sqlx error onto the store's error kinds.
fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
            classify_sqlstate(&code, db.message())
        }
        sqlx::Error::RowNotFound
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::InvalidData(err.to_string()),
        other => StoreError::Unavailable(other.to_string()),
    }
}

/// Only connection exceptions (08), insufficient resources (53) and operator
/// intervention such as shutdown (57P) are transient.
fn classify_sqlstate(code: &str, message: &str) -> StoreError {
    if code.starts_with("23") {
        StoreError::Conflict(message.to_string())
    } else if code.starts_with("08") || code.starts_with("53") || code.starts_with("57P") {
        StoreError::Unavailable(format!("database error {}: {}", code, message))
    } else {
        StoreError::Backend(format!("database error {}: {}", code, message))
    }
}

fn parameter_from_row(row: &PgRow) -> StoreResult<ParameterRecord> {
    Ok(ParameterRecord {
        id: row.try_get("id").map_err(classify)?,
        type_id: row.try_get("type_id").map_err(classify)?,
        key: row.try_get("key").map_err(classify)?,
        description: row.try_get("description").map_err(classify)?,
        value: row.try_get("value").map_err(classify)?,
        active: row.try_get("active").map_err(classify)?,
        created_at: row.try_get("created_at").map_err(classify)?,
        updated_at: row.try_get("updated_at").map_err(classify)?,
    })
}

fn type_from_row(row: &PgRow) -> StoreResult<ParameterTypeRecord> {
    Ok(ParameterTypeRecord {
        id: row.try_get("id").map_err(classify)?,
        key: row.try_get("key").map_err(classify)?,
        description: row.try_get("description").map_err(classify)?,
        active: row.try_get("active").map_err(classify)?,
        created_at: row.try_get("created_at").map_err(classify)?,
        updated_at: row.try_get("updated_at").map_err(classify)?,
    })
}

#[async_trait]
impl PolicyStore for PostgresPolicyStore {
    async fn list_active(&self) -> StoreResult<Vec<ParameterRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM parameter WHERE active ORDER BY id",
            PARAMETER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        rows.iter().map(parameter_from_row).collect()
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<ParameterRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM parameter WHERE key = $1 AND active",
            PARAMETER_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.as_ref().map(parameter_from_row).transpose()
    }

    async fn upsert(&self, key: &str, value: &str) -> StoreResult<ParameterRecord> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(classify)?;

        sqlx::query(
            r#"
            INSERT INTO parameter_type (key, description, active, created_at, updated_at)
            VALUES ($1, $2, TRUE, $3, $3)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(ParameterTypeRecord::auto_description(key))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        let type_id: i64 = sqlx::query("SELECT id FROM parameter_type WHERE key = $1")
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?
            .try_get("id")
            .map_err(classify)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO parameter (type_id, key, value, active, created_at, updated_at)
            VALUES ($1, $2, $3, TRUE, $4, $4)
            ON CONFLICT (key) WHERE active
            DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            PARAMETER_COLUMNS
        ))
        .bind(type_id)
        .bind(key)
        .bind(value)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        let record = parameter_from_row(&row)?;
        tx.commit().await.map_err(classify)?;

        tracing::debug!(key = %key, id = record.id, "Upserted policy parameter");
        Ok(record)
    }

    async fn find_type_by_id(&self, id: i64) -> StoreResult<Option<ParameterTypeRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM parameter_type WHERE id = $1",
            TYPE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.as_ref().map(type_from_row).transpose()
    }

    async fn list_types(&self) -> StoreResult<Vec<ParameterTypeRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM parameter_type ORDER BY id",
            TYPE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        rows.iter().map(type_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_transient() {
        assert!(matches!(
            classify(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            classify(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn decode_errors_are_invalid_data() {
        assert!(matches!(
            classify(sqlx::Error::RowNotFound),
            StoreError::InvalidData(_)
        ));
        assert!(matches!(
            classify(sqlx::Error::ColumnNotFound("value".into())),
            StoreError::InvalidData(_)
        ));
    }

    #[test]
    fn sqlstate_classes_decide_retryability() {
        assert!(matches!(
            classify_sqlstate("23505", "duplicate key"),
            StoreError::Conflict(_)
        ));
        for transient in ["08006", "08001", "53300", "57P01"] {
            let err = classify_sqlstate(transient, "connection lost");
            assert!(err.is_retryable(), "{}", transient);
        }
        for permanent in ["42601", "42501", "42P01", "22P02", "57014", ""] {
            let err = classify_sqlstate(permanent, "statement failed");
            assert!(matches!(err, StoreError::Backend(_)), "{}", permanent);
            assert!(!err.is_retryable(), "{}", permanent);
        }
    }
}
