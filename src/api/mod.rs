use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, SeaOrmAccountService, SeaOrmTokenService, TokenService,
};

mod accounts;
pub mod auth;
mod error;
mod observability;
mod system;
mod types;

pub use error::ApiError;
pub use types::*;

pub struct AppState {
    pub store: Store,

    pub config: Config,

    pub accounts: Arc<dyn AccountService>,

    pub tokens: Arc<dyn TokenService>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

pub async fn create_app_state(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let accounts: Arc<dyn AccountService> = Arc::new(SeaOrmAccountService::new(
        store.clone(),
        config.security.clone(),
    ));
    let tokens: Arc<dyn TokenService> = Arc::new(SeaOrmTokenService::new(store.clone()));

    Ok(Arc::new(AppState {
        store,
        config,
        accounts,
        tokens,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let v1 = Router::new()
        .route("/users", post(accounts::create_account))
        .route("/users/{public_id}", get(accounts::get_account))
        .route("/users/{public_id}", put(accounts::update_account))
        .route("/users/{public_id}", delete(accounts::delete_account))
        .route(
            "/users/{public_id}/password",
            put(accounts::change_password),
        )
        .route("/system/status", get(system::get_status));

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api/v1", v1)
        .route("/api-token-auth", post(auth::obtain_token))
        .route("/metrics", get(observability::get_metrics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_token,
        ))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .with_state(state)
}
