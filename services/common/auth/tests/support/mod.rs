#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use common_auth::config::{MIN_AUTH_TIME_KEY, SERVER_DOMAIN_KEY};
use common_auth::{AuthError, AuthResult, KeyResolver, RuntimeAuthConfig};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use once_cell::sync::Lazy;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::EncodePublicKey;
use rsa::rand_core::OsRng;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

pub const KID: &str = "kid_key";
pub const AUDIENCE: &str = "server-domain.example.com";
pub const ISSUER: &str = "https://cms.mirohani.com";

pub struct KeyMaterial {
    pub encoding: EncodingKey,
    pub spki: String,
}

pub static KEYS: Lazy<KeyMaterial> = Lazy::new(|| {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .expect("private pem");
    let spki = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("spki pem");
    KeyMaterial {
        encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
        spki,
    }
});

/// 2025-01-01T00:00:00+09:00
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 31, 15, 0, 0).unwrap()
}

pub fn token_claims(issued_at: DateTime<Utc>) -> Value {
    json!({
        "iss": ISSUER,
        "sub": "mirohaniUserId",
        "aud": AUDIENCE,
        "iat": issued_at.timestamp(),
        "exp": (issued_at + Duration::hours(2)).timestamp(),
        "auth_time": (issued_at - Duration::days(365)).timestamp(),
        "mirohani_user_id": "mirohaniUserId",
    })
}

pub fn sign(kid: Option<&str>, claims: &Value) -> String {
    let header = Header {
        typ: None,
        kid: kid.map(str::to_string),
        ..Header::new(Algorithm::PS256)
    };
    encode(&header, claims, &KEYS.encoding).expect("sign token")
}

/// A token with a hand-written header and a signature nobody produced.
pub fn forge(header: &Value, claims: &Value) -> String {
    let segment = |value: &Value| URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap());
    format!("{}.{}.c2lnbmF0dXJl", segment(header), segment(claims))
}

pub fn valid_token() -> String {
    sign(Some(KID), &token_claims(base_time()))
}

pub fn base_env() -> HashMap<String, String> {
    HashMap::from([
        (SERVER_DOMAIN_KEY.to_string(), AUDIENCE.to_string()),
        (
            MIN_AUTH_TIME_KEY.to_string(),
            "2024-01-01T00:00:00+09:00".to_string(),
        ),
    ])
}

/// Serves keys from memory and records every lookup.
#[derive(Default)]
pub struct StubResolver {
    keys: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl StubResolver {
    pub fn with_key(kid: &str, spki: &str) -> Self {
        Self {
            keys: HashMap::from([(kid.to_string(), spki.to_string())]),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyResolver for StubResolver {
    async fn fetch_public_key(&self, kid: &str, _config: &RuntimeAuthConfig) -> AuthResult<String> {
        self.calls.lock().unwrap().push(kid.to_string());
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
    }
}
