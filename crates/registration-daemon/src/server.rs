//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::auth::TokenIssuer;
use crate::config::{DaemonConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult, StorageError};
use crate::storage::{InMemoryUserStorage, PostgresUserStorage, UserStorage};
use crate::users::UserService;
use axum::Router;
use registration_policy::{
    InMemoryPolicyStore, PolicyAdmin, PolicyEngine, PolicyError, PolicyStore, PostgresPolicyStore,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Registration daemon server
pub struct Server {
    config: DaemonConfig,
    state: AppState,
}

impl Server {
    /// Wire storage, the policy engine and the user service together
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let (policy_store, user_storage) = open_storage(&config.storage).await?;

        let engine = Arc::new(PolicyEngine::new(policy_store.clone()));
        let admin = Arc::new(PolicyAdmin::new(
            policy_store,
            engine.clone(),
            config.policy.admin_config(),
        ));

        if config.policy.seed_defaults {
            let seeded = admin.seed_defaults().await?;
            tracing::info!(seeded, "Password policy defaults checked");
        }

        let tokens = Arc::new(TokenIssuer::new(&config.auth));
        let users = Arc::new(UserService::new(user_storage, engine.clone(), tokens.clone()));
        let state = AppState::new(users, admin, engine, tokens);

        Ok(Self { config, state })
    }

    /// Build the HTTP router for this server
    pub fn router(&self) -> Router {
        let app = create_router(self.state.clone());
        if self.config.server.enable_cors {
            app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            app
        }
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = self.router();

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Registration daemon listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Registration daemon shutting down");
        Ok(())
    }
}

async fn open_storage(
    config: &StorageConfig,
) -> DaemonResult<(Arc<dyn PolicyStore>, Arc<dyn UserStorage>)> {
    match config {
        StorageConfig::Memory => {
            tracing::info!("Using in-memory storage");
            let policy_store: Arc<dyn PolicyStore> = Arc::new(InMemoryPolicyStore::new());
            let user_storage: Arc<dyn UserStorage> = Arc::new(InMemoryUserStorage::new());
            Ok((policy_store, user_storage))
        }
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            let pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .acquire_timeout(Duration::from_secs(*connect_timeout_secs))
                .connect(url)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

            let policy_store: Arc<dyn PolicyStore> = Arc::new(
                PostgresPolicyStore::from_pool(pool.clone())
                    .await
                    .map_err(PolicyError::from)?,
            );
            let user_storage: Arc<dyn UserStorage> =
                Arc::new(PostgresUserStorage::from_pool(pool).await?);

            tracing::info!(max_connections, "Using PostgreSQL storage");
            Ok((policy_store, user_storage))
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
