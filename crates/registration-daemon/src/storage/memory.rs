//! In-memory storage implementation

use super::traits::*;
use crate::error::StorageError;
use crate::users::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory user storage for development and testing
#[derive(Debug, Default)]
pub struct InMemoryUserStorage {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStorage for InMemoryUserStorage {
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: User) -> StorageResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StorageError::Conflict(format!(
                "user with email {} already exists",
                user.email
            )));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn record_login(
        &self,
        id: Uuid,
        token: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.token = token.to_string();
            user.last_login = at;
            user.modified = at;
            user.clone()
        }))
    }
}
