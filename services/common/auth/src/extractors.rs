use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::claims::VerifiedIdentity;
use crate::error::AuthError;

/// The identity attached by [`crate::middleware::jwt_auth`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: VerifiedIdentity,
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        self.identity.user_id()
    }

    pub fn into_identity(self) -> VerifiedIdentity {
        self.identity
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<VerifiedIdentity>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)?;

        Ok(Self { identity })
    }
}
