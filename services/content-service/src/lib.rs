pub mod config;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use common_auth::{
    jwt_auth, AuthContext, AuthState, CachingKeyResolver, ConfigSource, KeyResolver,
    RemoteKeyStore, VerifiedIdentity,
};
use common_observability::AuthMetrics;
use tracing::error;

use crate::config::ServiceConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub metrics: AuthMetrics,
}

impl AppState {
    pub fn new(
        env: Arc<dyn ConfigSource>,
        resolver: Arc<dyn KeyResolver>,
    ) -> anyhow::Result<Self> {
        let metrics = AuthMetrics::new()?;
        let auth = AuthState::new(env, resolver).with_metrics(metrics.clone());
        Ok(Self { auth, metrics })
    }

    pub fn from_config(env: Arc<dyn ConfigSource>, config: &ServiceConfig) -> anyhow::Result<Self> {
        let store = RemoteKeyStore::new(config.key_fetch_timeout)?;
        let resolver: Arc<dyn KeyResolver> = match config.key_cache_ttl {
            Some(ttl) => Arc::new(CachingKeyResolver::new(store, ttl)),
            None => Arc::new(store),
        };
        Self::new(env, resolver)
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => body.into_response(),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn me(auth: AuthContext) -> Json<VerifiedIdentity> {
    Json(auth.into_identity())
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/me", get(me))
        .layer(middleware::from_fn_with_state(state.auth.clone(), jwt_auth));

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
        .merge(protected)
}
