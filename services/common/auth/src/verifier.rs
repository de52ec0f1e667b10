use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::debug;

use crate::claims::{IdentityClaims, TokenHeader, VerifiedIdentity, AUTH_TIME_CLAIM, USER_ID_CLAIM};
use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, AuthResult};

/// The only signature algorithm accepted.
pub const ALLOWED_ALGORITHM: Algorithm = Algorithm::PS256;
const ALLOWED_ALGORITHM_NAME: &str = "PS256";

/// Expected issuer claim (iss).
pub const EXPECTED_ISSUER: &str = "https://cms.mirohani.com";

/// Per-request verification parameters.
#[derive(Debug, Clone)]
pub struct VerifyParams {
    pub audience: String,
    pub min_auth_time: DateTime<FixedOffset>,
}

/// Verifies PS256 tokens and the claims this API relies on.
///
/// Checks run in a fixed order and stop at the first failure:
/// algorithm, signature, `iss`/`aud`, required claims, `iat`, `exp`, `auth_time`.
#[derive(Clone)]
pub struct TokenVerifier {
    clock: Arc<dyn Clock>,
    issuer: String,
}

impl Default for TokenVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenVerifier {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            issuer: EXPECTED_ISSUER.to_string(),
        }
    }

    pub fn verify(
        &self,
        token: &str,
        key: &DecodingKey,
        params: &VerifyParams,
    ) -> AuthResult<VerifiedIdentity> {
        // Read untyped so names jsonwebtoken does not know ("none", "ES512") still land here.
        let header = TokenHeader::from_token(token)
            .map_err(|err| AuthError::MalformedToken(err.to_string()))?;
        match header.alg.as_deref() {
            Some(ALLOWED_ALGORITHM_NAME) => {}
            other => {
                return Err(AuthError::AlgorithmNotAllowed(
                    other.unwrap_or("<missing>").to_string(),
                ))
            }
        }

        let mut validation = Validation::new(ALLOWED_ALGORITHM);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[params.audience.as_str()]);
        validation.set_required_spec_claims(&["iss", "aud"]);
        // Temporal claims are checked below against the injected clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let claims = decode::<Value>(token, key, &validation)?.claims;

        for required in [AUTH_TIME_CLAIM, USER_ID_CLAIM] {
            if claims.get(required).map_or(true, Value::is_null) {
                return Err(AuthError::MissingRequiredClaim(required.to_string()));
            }
        }

        let now = self.clock.now().timestamp() as f64;
        let min_auth_time = params.min_auth_time.timestamp() as f64;

        match numeric_date(&claims, "iat")? {
            Some(iat) if iat <= now => {}
            _ => return Err(AuthError::IssuedAtInFuture),
        }

        match numeric_date(&claims, "exp")? {
            Some(exp) if now < exp => {}
            _ => return Err(AuthError::TokenExpired),
        }

        match numeric_date(&claims, AUTH_TIME_CLAIM)? {
            Some(auth_time) if min_auth_time <= auth_time => {}
            _ => return Err(AuthError::AuthTimeTooOld),
        }

        let payload = IdentityClaims::try_from(claims)?;
        debug!(kid = ?header.kid, user_id = %payload.user_id, "verified JWT successfully");
        Ok(VerifiedIdentity::new(payload, header))
    }
}

/// Reads a NumericDate claim; absent or null yields `None`. Fractions are kept.
fn numeric_date(claims: &Value, name: &str) -> AuthResult<Option<f64>> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| AuthError::MalformedToken(format!("'{name}' is not a NumericDate"))),
    }
}
