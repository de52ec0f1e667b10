use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common_observability::AuthMetrics;
use jsonwebtoken::DecodingKey;
use tracing::{debug, error, warn};

use crate::claims::VerifiedIdentity;
use crate::config::{ConfigSource, RuntimeAuthConfig};
use crate::error::{AuthError, AuthResult, ErrorCategory};
use crate::key_resolver::{decoding_key_from_spki, extract_key_id, KeyResolver};
use crate::verifier::{TokenVerifier, VerifyParams};

/// Everything the JWT middleware needs, shared across requests.
#[derive(Clone)]
pub struct AuthState {
    config: Arc<dyn ConfigSource>,
    resolver: Arc<dyn KeyResolver>,
    verifier: TokenVerifier,
    metrics: Option<AuthMetrics>,
}

impl AuthState {
    pub fn new(config: Arc<dyn ConfigSource>, resolver: Arc<dyn KeyResolver>) -> Self {
        Self {
            config,
            resolver,
            verifier: TokenVerifier::new(),
            metrics: None,
        }
    }

    pub fn with_verifier(mut self, verifier: TokenVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_metrics(mut self, metrics: AuthMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&AuthMetrics> {
        self.metrics.as_ref()
    }

    /// Run config, header, key and claim checks for one request.
    pub async fn authenticate(&self, headers: &HeaderMap) -> AuthResult<VerifiedIdentity> {
        let config = RuntimeAuthConfig::from_source(self.config.as_ref())?;
        let token = parse_bearer(headers.get(AUTHORIZATION))?;
        let key = self.resolve_key(token, &config).await?;

        let params = VerifyParams {
            audience: config.expected_audience,
            min_auth_time: config.min_auth_time,
        };
        self.verifier.verify(token, &key, &params)
    }

    async fn resolve_key(&self, token: &str, config: &RuntimeAuthConfig) -> AuthResult<DecodingKey> {
        let kid = extract_key_id(token)?;

        let timer = self
            .metrics
            .as_ref()
            .map(|metrics| metrics.public_key_fetch_duration_seconds.start_timer());
        let spki = self.resolver.fetch_public_key(&kid, config).await;
        if let Some(timer) = timer {
            timer.observe_duration();
        }

        decoding_key_from_spki(&kid, &spki?)
    }

    fn record_rejection(&self, err: &AuthError) {
        let stage = err.category();
        match stage {
            ErrorCategory::Config => error!(error = %err, "auth configuration invalid"),
            ErrorCategory::AuthorizationHeader => {
                debug!(reason = err.reason(), "rejected Authorization header")
            }
            ErrorCategory::KeyResolution => {
                warn!(error = %err, reason = err.reason(), "failed to resolve public key")
            }
            ErrorCategory::ClaimValidation => {
                warn!(error = %err, reason = err.reason(), "token verification failed")
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_failure(stage.as_str(), err.reason());
        }
    }
}

/// Axum middleware: attaches a [`VerifiedIdentity`] to the request or rejects it.
///
/// Mount with `axum::middleware::from_fn_with_state(state, jwt_auth)`.
pub async fn jwt_auth(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let outcome = state.authenticate(req.headers()).await;
    match outcome {
        Ok(identity) => {
            if let Some(metrics) = &state.metrics {
                metrics.record_success();
            }
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(err) => {
            state.record_rejection(&err);
            err.into_response()
        }
    }
}

/// Accepts exactly `Bearer <token>` with a single non-empty token.
pub fn parse_bearer(value: Option<&HeaderValue>) -> AuthResult<&str> {
    let raw = value
        .ok_or(AuthError::MissingAuthorization)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorization)?;

    let token = raw
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthorization)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::InvalidAuthorization);
    }

    Ok(token)
}
