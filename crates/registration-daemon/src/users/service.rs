//! Registration and login flows

use super::model::{normalize_email, LoginRequest, RegisterRequest, User, UserView};
use super::password::{hash_password, verify_password};
use super::UserError;
use crate::auth::TokenIssuer;
use crate::error::StorageError;
use crate::storage::UserStorage;
use chrono::Utc;
use registration_policy::PolicyEngine;
use std::sync::Arc;
use uuid::Uuid;

/// Registers and authenticates users.
///
/// Passwords are checked against the policy engine before anything is stored.
pub struct UserService {
    storage: Arc<dyn UserStorage>,
    engine: Arc<PolicyEngine>,
    tokens: Arc<TokenIssuer>,
}

impl UserService {
    pub fn new(
        storage: Arc<dyn UserStorage>,
        engine: Arc<PolicyEngine>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            storage,
            engine,
            tokens,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<UserView, UserError> {
        request.validate().map_err(UserError::Validation)?;
        let email = normalize_email(&request.email);

        if self.storage.find_by_email(&email).await?.is_some() {
            return Err(UserError::DuplicateEmail);
        }

        if !self.engine.validate(&request.password).await? {
            tracing::info!(email = %email, "Registration rejected by password policy");
            return Err(UserError::InvalidPassword);
        }

        let password_hash = hash_password(&request.password)?;
        let token = self
            .tokens
            .issue(&email)
            .map_err(|err| UserError::Credentials(err.to_string()))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email,
            password_hash,
            phones: request.phones,
            token,
            is_active: true,
            created: now,
            modified: now,
            last_login: now,
        };

        let saved = match self.storage.insert_user(user).await {
            Ok(saved) => saved,
            // Lost a race with a concurrent registration.
            Err(StorageError::Conflict(_)) => return Err(UserError::DuplicateEmail),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(user_id = %saved.id, email = %saved.email, "Registered user");
        Ok(UserView::from(&saved))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<UserView, UserError> {
        request.validate().map_err(UserError::Validation)?;
        let email = normalize_email(&request.email);

        let Some(user) = self.storage.find_by_email(&email).await? else {
            return Err(UserError::InvalidCredentials);
        };
        if !user.is_active || !verify_password(&user.password_hash, &request.password)? {
            tracing::debug!(user_id = %user.id, "Login rejected");
            return Err(UserError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&email)
            .map_err(|err| UserError::Credentials(err.to_string()))?;
        let updated = self
            .storage
            .record_login(user.id, &token, Utc::now())
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        tracing::info!(user_id = %updated.id, "User logged in");
        Ok(UserView::from(&updated))
    }
}
