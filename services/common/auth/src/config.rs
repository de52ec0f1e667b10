use std::collections::HashMap;
use std::env;

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AuthError, AuthResult};

pub const SERVER_DOMAIN_KEY: &str = "SERVER_DOMAIN";
pub const MIN_AUTH_TIME_KEY: &str = "MIN_AUTH_TIME";
pub const DEVELOPMENT_PUBLIC_KEY_URL_KEY: &str = "DEVELOPMENT_PUBLIC_KEY_URL";

/// Production key store, used whenever no acceptable override is configured.
pub const DEFAULT_KEY_STORE_URL: &str = "https://secure.mirohani.com";

static MIN_AUTH_TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[+-]\d{2}:\d{2}$")
        .expect("static pattern compiles")
});

/// Source of the raw auth settings, consulted on every request.
pub trait ConfigSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads settings from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Settings needed to authenticate a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeAuthConfig {
    /// Expected audience claim (aud), taken from `SERVER_DOMAIN`.
    pub expected_audience: String,
    /// Oldest acceptable `auth_time`.
    pub min_auth_time: DateTime<FixedOffset>,
    pub key_store_url: String,
    pub development_key_store_url: Option<String>,
}

impl RuntimeAuthConfig {
    /// Validate and parse the settings exposed by `source`.
    pub fn from_source(source: &dyn ConfigSource) -> AuthResult<Self> {
        let expected_audience = source
            .var(SERVER_DOMAIN_KEY)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingConfig(SERVER_DOMAIN_KEY))?;

        let raw_min_auth_time = source
            .var(MIN_AUTH_TIME_KEY)
            .ok_or(AuthError::MissingConfig(MIN_AUTH_TIME_KEY))?;
        let min_auth_time = parse_min_auth_time(&raw_min_auth_time)?;

        let development_key_store_url = source
            .var(DEVELOPMENT_PUBLIC_KEY_URL_KEY)
            .filter(|value| !value.is_empty());

        Ok(Self {
            expected_audience,
            min_auth_time,
            key_store_url: DEFAULT_KEY_STORE_URL.to_string(),
            development_key_store_url,
        })
    }
}

/// Accepts only `YYYY-MM-DDThh:mm:ss±hh:mm`.
pub fn parse_min_auth_time(value: &str) -> AuthResult<DateTime<FixedOffset>> {
    if !MIN_AUTH_TIME_PATTERN.is_match(value) {
        return Err(AuthError::MissingConfig(MIN_AUTH_TIME_KEY));
    }
    DateTime::parse_from_rfc3339(value).map_err(|_| AuthError::MissingConfig(MIN_AUTH_TIME_KEY))
}
