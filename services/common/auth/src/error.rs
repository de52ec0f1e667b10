use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

pub const INVALID_AUTHORIZATION_MESSAGE: &str = "invalid Authorization header";
pub const KEY_RESOLUTION_MESSAGE: &str = "Failed to fetch public key";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("env.{0} is required")]
    MissingConfig(&'static str),
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error("failed to decode token header: {0}")]
    InvalidHeader(String),
    #[error("kid is required")]
    MissingKeyId,
    #[error("failed to fetch public key: {0}")]
    KeyFetch(String),
    #[error("key store has no public key for kid '{0}'")]
    UnknownKeyId(String),
    #[error("failed to parse public key for kid '{0}': {1}")]
    KeyParse(String, String),
    #[error("\"alg\" (Algorithm) Header Parameter value not allowed: {0}")]
    AlgorithmNotAllowed(String),
    #[error("signature verification failed")]
    SignatureInvalid,
    #[error("unexpected \"iss\" claim value")]
    IssuerMismatch,
    #[error("unexpected \"aud\" claim value")]
    AudienceMismatch,
    #[error("missing required \"{0}\" claim")]
    MissingRequiredClaim(String),
    #[error("\"iat\" claim timestamp check failed")]
    IssuedAtInFuture,
    #[error("\"exp\" claim timestamp check failed")]
    TokenExpired,
    #[error("\"auth_time\" claim timestamp check failed")]
    AuthTimeTooOld,
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("request carries no verified identity")]
    Unauthenticated,
}

/// Coarse grouping that decides what the caller is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    AuthorizationHeader,
    KeyResolution,
    ClaimValidation,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Config => "config",
            ErrorCategory::AuthorizationHeader => "header",
            ErrorCategory::KeyResolution => "key",
            ErrorCategory::ClaimValidation => "verify",
        }
    }
}

impl AuthError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::MissingConfig(_) => ErrorCategory::Config,
            AuthError::MissingAuthorization | AuthError::InvalidAuthorization => {
                ErrorCategory::AuthorizationHeader
            }
            AuthError::InvalidHeader(_)
            | AuthError::MissingKeyId
            | AuthError::KeyFetch(_)
            | AuthError::UnknownKeyId(_)
            | AuthError::KeyParse(_, _) => ErrorCategory::KeyResolution,
            AuthError::AlgorithmNotAllowed(_)
            | AuthError::SignatureInvalid
            | AuthError::IssuerMismatch
            | AuthError::AudienceMismatch
            | AuthError::MissingRequiredClaim(_)
            | AuthError::IssuedAtInFuture
            | AuthError::TokenExpired
            | AuthError::AuthTimeTooOld
            | AuthError::MalformedToken(_)
            | AuthError::Unauthenticated => ErrorCategory::ClaimValidation,
        }
    }

    /// Stable label used for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingConfig(_) => "missing_config",
            AuthError::MissingAuthorization => "missing_header",
            AuthError::InvalidAuthorization => "malformed_header",
            AuthError::InvalidHeader(_) => "invalid_token_header",
            AuthError::MissingKeyId => "missing_kid",
            AuthError::KeyFetch(_) => "key_fetch_failed",
            AuthError::UnknownKeyId(_) => "unknown_kid",
            AuthError::KeyParse(_, _) => "key_parse_failed",
            AuthError::AlgorithmNotAllowed(_) => "algorithm_not_allowed",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::MissingRequiredClaim(_) => "missing_claim",
            AuthError::IssuedAtInFuture => "iat_in_future",
            AuthError::TokenExpired => "expired",
            AuthError::AuthTimeTooOld => "auth_time_too_old",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::Unauthenticated => "unauthenticated",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.category() {
            ErrorCategory::Config => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match value.kind() {
            ErrorKind::InvalidAlgorithm => Self::AlgorithmNotAllowed(value.to_string()),
            ErrorKind::InvalidSignature => Self::SignatureInvalid,
            ErrorKind::InvalidIssuer => Self::IssuerMismatch,
            ErrorKind::InvalidAudience => Self::AudienceMismatch,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingRequiredClaim(claim.clone()),
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            _ => Self::MalformedToken(value.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Only operator-facing config errors describe themselves.
        let message = match self.category() {
            ErrorCategory::Config => self.to_string(),
            ErrorCategory::AuthorizationHeader => INVALID_AUTHORIZATION_MESSAGE.to_string(),
            ErrorCategory::KeyResolution => KEY_RESOLUTION_MESSAGE.to_string(),
            ErrorCategory::ClaimValidation => UNAUTHORIZED_MESSAGE.to_string(),
        };
        (self.status(), message).into_response()
    }
}
