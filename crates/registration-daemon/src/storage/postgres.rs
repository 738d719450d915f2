//! PostgreSQL storage implementation

use super::traits::*;
use crate::error::StorageError;
use crate::users::{Phone, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, token, is_active, created, modified, last_login";

/// PostgreSQL-backed user storage
#[derive(Debug, Clone)]
pub struct PostgresUserStorage {
    pool: PgPool,
}

impl PostgresUserStorage {
    /// Wrap an existing pool and initialize schema
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let storage = Self { pool };
        storage.initialize_schema().await?;
        Ok(storage)
    }

    async fn initialize_schema(&self) -> StorageResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                token TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created TIMESTAMPTZ NOT NULL,
                modified TIMESTAMPTZ NOT NULL,
                last_login TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS phones (
                id BIGSERIAL PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                number TEXT NOT NULL,
                city_code TEXT NOT NULL,
                country_code TEXT NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS phones_user_id ON phones(user_id);"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }

        Ok(())
    }

    async fn load_phones(&self, user_id: Uuid) -> StorageResult<Vec<Phone>> {
        let rows = sqlx::query(
            "SELECT number, city_code, country_code FROM phones WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        rows.iter()
            .map(|row| {
                Ok(Phone {
                    number: row.try_get("number").map_err(classify)?,
                    city_code: row.try_get("city_code").map_err(classify)?,
                    country_code: row.try_get("country_code").map_err(classify)?,
                })
            })
            .collect()
    }

    async fn user_with_phones(&self, row: &PgRow) -> StorageResult<User> {
        let mut user = user_from_row(row)?;
        user.phones = self.load_phones(user.id).await?;
        Ok(user)
    }
}

fn classify(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) => StorageError::Query(db.message().to_string()),
        sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_) => StorageError::InvalidData(err.to_string()),
        other => StorageError::Connection(other.to_string()),
    }
}

fn user_from_row(row: &PgRow) -> StorageResult<User> {
    Ok(User {
        id: row.try_get("id").map_err(classify)?,
        name: row.try_get("name").map_err(classify)?,
        email: row.try_get("email").map_err(classify)?,
        password_hash: row.try_get("password_hash").map_err(classify)?,
        phones: Vec::new(),
        token: row.try_get("token").map_err(classify)?,
        is_active: row.try_get("is_active").map_err(classify)?,
        created: row.try_get("created").map_err(classify)?,
        modified: row.try_get("modified").map_err(classify)?,
        last_login: row.try_get("last_login").map_err(classify)?,
    })
}

#[async_trait]
impl UserStorage for PostgresUserStorage {
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        match row {
            Some(row) => Ok(Some(self.user_with_phones(&row).await?)),
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: User) -> StorageResult<User> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, token, is_active, created, modified, last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.token)
        .bind(user.is_active)
        .bind(user.created)
        .bind(user.modified)
        .bind(user.last_login)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        for phone in &user.phones {
            sqlx::query(
                "INSERT INTO phones (user_id, number, city_code, country_code) VALUES ($1, $2, $3, $4)",
            )
            .bind(user.id)
            .bind(&phone.number)
            .bind(&phone.city_code)
            .bind(&phone.country_code)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        }

        tx.commit().await.map_err(classify)?;
        Ok(user)
    }

    async fn record_login(
        &self,
        id: Uuid,
        token: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users SET token = $2, last_login = $3, modified = $3 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(token)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        match row {
            Some(row) => Ok(Some(self.user_with_phones(&row).await?)),
            None => Ok(None),
        }
    }
}
