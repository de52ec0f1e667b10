use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;

use crate::claims::TokenHeader;
use crate::config::RuntimeAuthConfig;
use crate::error::{AuthError, AuthResult};

/// Upper bound on a single key-store round trip.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

static DEVELOPMENT_URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^http://localhost:\d+/").expect("static pattern compiles"));

/// Read the `kid` from the token header without verifying the signature.
///
/// `alg` is not looked at here; the verifier rejects it after the key is fetched.
pub fn extract_key_id(token: &str) -> AuthResult<String> {
    TokenHeader::from_token(token)?
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(AuthError::MissingKeyId)
}

/// Endpoint that serves the `{kid: spki}` map for this request.
pub fn key_store_url(config: &RuntimeAuthConfig) -> &str {
    match config.development_key_store_url.as_deref() {
        Some(url) if DEVELOPMENT_URL_PATTERN.is_match(url) => url,
        _ => &config.key_store_url,
    }
}

/// Parse an SPKI (`-----BEGIN PUBLIC KEY-----`) RSA key.
pub fn decoding_key_from_spki(kid: &str, spki: &str) -> AuthResult<DecodingKey> {
    DecodingKey::from_rsa_pem(spki.as_bytes())
        .map_err(|err| AuthError::KeyParse(kid.to_string(), err.to_string()))
}

/// Looks up the public key registered for a key id.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Returns the SPKI-encoded public key for `kid`.
    async fn fetch_public_key(&self, kid: &str, config: &RuntimeAuthConfig) -> AuthResult<String>;
}

#[async_trait]
impl<T: KeyResolver + ?Sized> KeyResolver for Arc<T> {
    async fn fetch_public_key(&self, kid: &str, config: &RuntimeAuthConfig) -> AuthResult<String> {
        (**self).fetch_public_key(kid, config).await
    }
}

/// Fetches keys from the remote key store on every call.
#[derive(Clone)]
pub struct RemoteKeyStore {
    client: Client,
}

impl RemoteKeyStore {
    pub fn new(timeout: Duration) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::KeyFetch(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl KeyResolver for RemoteKeyStore {
    async fn fetch_public_key(&self, kid: &str, config: &RuntimeAuthConfig) -> AuthResult<String> {
        let url = key_store_url(config);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| AuthError::KeyFetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetch(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let mut keys: HashMap<String, Option<String>> = response
            .json()
            .await
            .map_err(|err| AuthError::KeyFetch(err.to_string()))?;

        keys.remove(kid)
            .flatten()
            .filter(|spki| !spki.is_empty())
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
    }
}
