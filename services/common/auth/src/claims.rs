use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{AuthError, AuthResult};

pub const AUTH_TIME_CLAIM: &str = "auth_time";
pub const USER_ID_CLAIM: &str = "mirohani_user_id";

/// Claims of a token that passed every check, keyed by their wire names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(rename = "aud")]
    pub audience: Audience,
    #[serde(rename = "iat")]
    pub issued_at: NumericDate,
    #[serde(rename = "exp")]
    pub expires_at: NumericDate,
    pub auth_time: NumericDate,
    #[serde(rename = "mirohani_user_id")]
    pub user_id: String,
    /// Every other claim, passed through unvalidated.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::Single(value) => value == expected,
            Audience::Many(values) => values.iter().any(|value| value == expected),
        }
    }
}

/// Seconds since the epoch, kept as the number the issuer wrote.
///
/// Fractional values are legal and survive re-serialization unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumericDate(Number);

impl NumericDate {
    pub fn seconds(&self) -> Option<f64> {
        self.0.as_f64().filter(|seconds| seconds.is_finite())
    }

    fn to_datetime(&self, claim: &str) -> AuthResult<DateTime<Utc>> {
        let out_of_range =
            || AuthError::MalformedToken(format!("'{claim}' out of range: {}", self.0));
        let seconds = self.seconds().ok_or_else(out_of_range)?;
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9) as u32;
        Utc.timestamp_opt(whole as i64, nanos)
            .single()
            .ok_or_else(out_of_range)
    }
}

impl From<i64> for NumericDate {
    fn from(seconds: i64) -> Self {
        Self(Number::from(seconds))
    }
}

impl IdentityClaims {
    pub fn issued_at(&self) -> AuthResult<DateTime<Utc>> {
        self.issued_at.to_datetime("iat")
    }

    pub fn expires_at(&self) -> AuthResult<DateTime<Utc>> {
        self.expires_at.to_datetime("exp")
    }

    pub fn auth_time(&self) -> AuthResult<DateTime<Utc>> {
        self.auth_time.to_datetime(AUTH_TIME_CLAIM)
    }
}

impl TryFrom<Value> for IdentityClaims {
    type Error = AuthError;

    fn try_from(value: Value) -> AuthResult<Self> {
        serde_json::from_value(value).map_err(|err| AuthError::MalformedToken(err.to_string()))
    }
}

/// Protected JOSE header, read without trusting or interpreting `alg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Every other header parameter, as sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenHeader {
    /// Decode the first segment of a compact JWS. The signature is not checked.
    pub fn from_token(token: &str) -> AuthResult<Self> {
        let segments: Vec<&str> = token.split('.').collect();
        let [encoded, _, _] = segments.as_slice() else {
            return Err(AuthError::InvalidHeader(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|err| AuthError::InvalidHeader(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| AuthError::InvalidHeader(err.to_string()))
    }
}

/// A fully verified token: payload plus protected header.
///
/// Only the verifier constructs this, and only after all checks pass.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedIdentity {
    payload: IdentityClaims,
    header: TokenHeader,
}

impl VerifiedIdentity {
    pub(crate) fn new(payload: IdentityClaims, header: TokenHeader) -> Self {
        Self { payload, header }
    }

    pub fn payload(&self) -> &IdentityClaims {
        &self.payload
    }

    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    pub fn user_id(&self) -> &str {
        &self.payload.user_id
    }

    pub fn key_id(&self) -> Option<&str> {
        self.header.kid.as_deref()
    }
}
