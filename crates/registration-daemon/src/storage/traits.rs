//! Storage trait definitions

use crate::error::StorageError;
use crate::users::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage for registered users
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Get a user by normalized email
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Insert a new user; fails with `Conflict` when the email is taken
    async fn insert_user(&self, user: User) -> StorageResult<User>;

    /// Store a fresh token and login time
    async fn record_login(
        &self,
        id: Uuid,
        token: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<User>>;
}
