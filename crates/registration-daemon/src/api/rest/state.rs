//! Application state for API handlers

use crate::auth::TokenIssuer;
use crate::users::UserService;
use registration_policy::{PolicyAdmin, PolicyEngine};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Registration and login
    pub users: Arc<UserService>,

    /// Policy parameter administration
    pub admin: Arc<PolicyAdmin>,

    /// Password policy engine
    pub engine: Arc<PolicyEngine>,

    /// Bearer token issuer
    pub tokens: Arc<TokenIssuer>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        users: Arc<UserService>,
        admin: Arc<PolicyAdmin>,
        engine: Arc<PolicyEngine>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            users,
            admin,
            engine,
            tokens,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (chrono::Utc::now() - self.started_at).num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        }
    }
}
