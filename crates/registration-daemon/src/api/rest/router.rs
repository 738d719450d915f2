//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::auth::require_auth;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    // Policy administration, bearer token required
    let admin_routes = Router::new()
        .route(
            "/configurations",
            get(handlers::list_configurations).put(handlers::upsert_configuration),
        )
        .route(
            "/configurations/types",
            get(handlers::list_configuration_types),
        )
        .route("/configurations/pattern", get(handlers::get_pattern))
        .route(
            "/configurations/:key",
            get(handlers::get_configuration).put(handlers::upsert_configuration_by_key),
        )
        .route(
            "/configurations/:key/value",
            put(handlers::upsert_configuration_by_key),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Registration and login are public
    let public_routes = Router::new()
        .route("/users/register", post(handlers::register_user))
        .route("/auth/login", post(handlers::login));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", public_routes.merge(admin_routes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
