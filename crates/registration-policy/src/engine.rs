//! Policy engine: owns the current matcher and keeps it in step with the store.
//!
//! The matcher lives in a single cell tagged with the store generation it was
//! compiled from. Every committed upsert bumps the generation through
//! [`PolicyEngine::invalidate`]. While a recompile is running, validators keep
//! evaluating against the installed matcher; a validator that finds the cell
//! stale with no recompile in flight compiles itself. Failed compilations leave
//! the previous matcher in place and are remembered until the next
//! invalidation.

use crate::compiler::compile;
use crate::error::{PolicyError, PolicyResult};
use crate::matcher::Matcher;
use crate::store::PolicyStore;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Externally visible engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// No compilation has been attempted yet.
    Uninitialized,
    /// A matcher is installed and the last compilation succeeded.
    Ready,
    /// The last compilation failed; any previous matcher is still in use.
    Failing,
    /// The store holds no active parameters for any recognized key.
    Unavailable,
}

#[derive(Debug, Clone)]
struct Snapshot {
    matcher: Arc<Matcher>,
    generation: u64,
}

#[derive(Debug, Default)]
struct Cell {
    current: Option<Snapshot>,
    failure: Option<(u64, PolicyError)>,
}

/// Holds the compiled matcher and answers validation requests.
pub struct PolicyEngine {
    store: Arc<dyn PolicyStore>,
    cell: RwLock<Cell>,
    generation: AtomicU64,
    recompile_lock: Mutex<()>,
}

impl PolicyEngine {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self {
            store,
            cell: RwLock::new(Cell::default()),
            generation: AtomicU64::new(0),
            recompile_lock: Mutex::new(()),
        }
    }

    /// Check a password against the current policy.
    ///
    /// Compiles first when no matcher exists, or when the installed one
    /// predates the latest committed upsert and nobody else is recompiling.
    /// Fails with [`PolicyError::Unavailable`] when the store has no active
    /// parameters.
    pub async fn validate(&self, password: &str) -> PolicyResult<bool> {
        let matcher = self.current().await?;
        Ok(matcher.validate(password))
    }

    /// The operator-facing pattern of the current matcher.
    pub async fn describe(&self) -> PolicyResult<String> {
        let matcher = self.current().await?;
        Ok(matcher.describe().to_string())
    }

    /// Mark the installed matcher as stale.
    ///
    /// Must be called after every committed upsert, before anything that can
    /// be cancelled.
    pub fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(generation, "Password policy invalidated");
    }

    /// Recompile from the store and swap the new matcher in.
    ///
    /// On failure the installed matcher is left untouched and the error is
    /// returned.
    pub async fn recompile(&self) -> PolicyResult<()> {
        let _guard = self.recompile_lock.lock().await;
        self.recompile_locked().await.map(|_| ())
    }

    pub fn status(&self) -> EngineStatus {
        let cell = self.cell.read();
        match (&cell.current, &cell.failure) {
            (None, None) => EngineStatus::Uninitialized,
            (None, Some((_, PolicyError::Unavailable))) => EngineStatus::Unavailable,
            (_, Some(_)) => EngineStatus::Failing,
            (Some(_), None) => EngineStatus::Ready,
        }
    }

    async fn current(&self) -> PolicyResult<Arc<Matcher>> {
        if let Some(matcher) = self.fresh()? {
            return Ok(matcher);
        }

        let _guard = match self.recompile_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                // A recompile is in flight; the installed matcher stays in
                // force until it swaps.
                if let Some(installed) = self.installed() {
                    return Ok(installed);
                }
                self.recompile_lock.lock().await
            }
        };
        // Another task may have compiled while we waited.
        if let Some(matcher) = self.fresh()? {
            return Ok(matcher);
        }
        self.recompile_locked().await
    }

    fn installed(&self) -> Option<Arc<Matcher>> {
        self.cell
            .read()
            .current
            .as_ref()
            .map(|snapshot| snapshot.matcher.clone())
    }

    /// The matcher to use for the current generation, if that generation has
    /// already been compiled (successfully or not).
    fn fresh(&self) -> PolicyResult<Option<Arc<Matcher>>> {
        let generation = self.generation.load(Ordering::Acquire);
        let cell = self.cell.read();

        if let Some(snapshot) = &cell.current {
            if snapshot.generation == generation {
                return Ok(Some(snapshot.matcher.clone()));
            }
        }

        match &cell.failure {
            Some((failed_at, err)) if *failed_at == generation => match &cell.current {
                Some(previous) => Ok(Some(previous.matcher.clone())),
                None => Err(err.clone()),
            },
            _ => Ok(None),
        }
    }

    async fn recompile_locked(&self) -> PolicyResult<Arc<Matcher>> {
        // Read the generation before the store so a concurrent upsert leaves
        // the result marked stale.
        let generation = self.generation.load(Ordering::Acquire);
        let records = self.store.list_active().await?;

        let compiled = if records.iter().any(|r| r.active && r.is_recognized()) {
            compile(&records)
        } else {
            tracing::error!(generation, "No active password policy parameters");
            Err(PolicyError::Unavailable)
        };

        let mut cell = self.cell.write();
        match compiled {
            Ok(matcher) => {
                let matcher = Arc::new(matcher);
                cell.current = Some(Snapshot {
                    matcher: matcher.clone(),
                    generation,
                });
                cell.failure = None;
                tracing::info!(generation, "Password policy matcher installed");
                Ok(matcher)
            }
            Err(err) => {
                tracing::warn!(
                    generation,
                    error = %err,
                    retained = cell.current.is_some(),
                    "Password policy compilation failed"
                );
                cell.failure = Some((generation, err.clone()));
                Err(err)
            }
        }
    }
}
