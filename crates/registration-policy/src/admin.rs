//! Admin surface for reading and mutating policy parameters.

use crate::engine::PolicyEngine;
use crate::error::{PolicyError, PolicyResult, StoreResult};
use crate::key::ParameterKey;
use crate::model::{ParameterTypeRecord, ParameterView};
use crate::store::PolicyStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Admin adapter settings.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Overall deadline for one admin request, recompile included.
    pub request_timeout: Duration,
    /// Retry a store call once when it fails as unavailable.
    pub retry_unavailable: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            retry_unavailable: true,
        }
    }
}

/// Reads and mutates parameters, recompiling the engine after each change.
pub struct PolicyAdmin {
    store: Arc<dyn PolicyStore>,
    engine: Arc<PolicyEngine>,
    config: AdminConfig,
}

impl PolicyAdmin {
    pub fn new(store: Arc<dyn PolicyStore>, engine: Arc<PolicyEngine>, config: AdminConfig) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    pub fn engine(&self) -> &Arc<PolicyEngine> {
        &self.engine
    }

    /// All active parameters, recognized or not.
    pub async fn get_all(&self) -> PolicyResult<Vec<ParameterView>> {
        self.within_deadline(async {
            let records = self.retrying("list_active", || self.store.list_active()).await?;
            Ok(records.into_iter().map(ParameterView::from).collect())
        })
        .await
    }

    pub async fn get_by_key(&self, key: &str) -> PolicyResult<ParameterView> {
        self.within_deadline(async {
            self.retrying("find_by_key", || self.store.find_by_key(key))
                .await?
                .map(ParameterView::from)
                .ok_or_else(|| PolicyError::NotFound(format!("parameter {}", key)))
        })
        .await
    }

    pub async fn list_types(&self) -> PolicyResult<Vec<ParameterTypeRecord>> {
        self.within_deadline(async {
            Ok(self.retrying("list_types", || self.store.list_types()).await?)
        })
        .await
    }

    /// Upsert the parameter whose type has the given catalog id.
    pub async fn upsert_by_type_id(&self, type_id: i64, value: &str) -> PolicyResult<ParameterView> {
        self.within_deadline(async {
            let parameter_type = self
                .retrying("find_type_by_id", || self.store.find_type_by_id(type_id))
                .await?
                .ok_or_else(|| PolicyError::NotFound(format!("parameter type {}", type_id)))?;
            self.upsert_and_recompile(&parameter_type.key, value).await
        })
        .await
    }

    /// Upsert the parameter stored under `key`.
    ///
    /// Unrecognized keys are stored but never reach the matcher.
    pub async fn upsert_by_key(&self, key: &str, value: &str) -> PolicyResult<ParameterView> {
        self.within_deadline(self.upsert_and_recompile(key, value))
            .await
    }

    /// The current matcher pattern, for operators only.
    pub async fn describe(&self) -> PolicyResult<String> {
        self.within_deadline(self.engine.describe()).await
    }

    /// Insert the default value for every recognized key without an active
    /// record. Returns how many keys were seeded.
    pub async fn seed_defaults(&self) -> PolicyResult<usize> {
        let mut seeded = 0;
        for key in ParameterKey::ALL {
            let existing = self
                .retrying("find_by_key", || self.store.find_by_key(key.as_str()))
                .await?;
            if existing.is_some() {
                continue;
            }
            self.retrying("upsert", || self.store.upsert(key.as_str(), key.default_value()))
                .await?;
            tracing::info!(key = %key, value = key.default_value(), "Seeded policy default");
            seeded += 1;
        }

        if seeded > 0 {
            self.engine.invalidate();
        }
        self.recompile_retrying().await?;
        Ok(seeded)
    }

    async fn upsert_and_recompile(&self, key: &str, value: &str) -> PolicyResult<ParameterView> {
        let record = self
            .retrying("upsert", || self.store.upsert(key, value))
            .await?;

        if !record.is_recognized() {
            tracing::debug!(key = %key, "Stored parameter outside the password policy");
            return Ok(record.into());
        }

        self.engine.invalidate();
        tracing::info!(key = %key, value = %value, "Password policy parameter updated");

        if let Err(err) = self.recompile_retrying().await {
            tracing::warn!(key = %key, error = %err, "Recompile after upsert failed; stored value kept");
            return Err(err);
        }
        Ok(record.into())
    }

    async fn recompile_retrying(&self) -> PolicyResult<()> {
        match self.engine.recompile().await {
            Err(PolicyError::Store(err)) if err.is_retryable() && self.config.retry_unavailable => {
                tracing::warn!(error = %err, "Policy store unavailable during recompile; retrying once");
                self.engine.recompile().await
            }
            other => other,
        }
    }

    async fn retrying<T, F, Fut>(&self, operation: &'static str, mut call: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        match call().await {
            Err(err) if err.is_retryable() && self.config.retry_unavailable => {
                tracing::warn!(operation, error = %err, "Policy store unavailable; retrying once");
                call().await
            }
            other => other,
        }
    }

    async fn within_deadline<T, Fut>(&self, fut: Fut) -> PolicyResult<T>
    where
        Fut: Future<Output = PolicyResult<T>>,
    {
        let deadline = Instant::now() + self.config.request_timeout;
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                // The store may have committed before the deadline hit.
                self.engine.invalidate();
                tracing::warn!(
                    timeout_ms = self.config.request_timeout.as_millis() as u64,
                    "Policy admin request timed out"
                );
                Err(PolicyError::Timeout(self.config.request_timeout))
            }
        }
    }
}
