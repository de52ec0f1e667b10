use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;

/// Startup settings. Per-request auth settings are read by the middleware itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub addr: SocketAddr,
    pub key_fetch_timeout: Duration,
    /// `None` keeps the fetch-per-request behaviour.
    pub key_cache_ttl: Option<Duration>,
}

pub fn load_service_config() -> Result<ServiceConfig> {
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Failed to parse HOST '{host}'"))?;
    let port = parse_u64_var("PORT")?
        .map(u16::try_from)
        .transpose()
        .context("PORT out of range")?
        .unwrap_or(DEFAULT_PORT);

    let key_fetch_timeout = Duration::from_millis(
        parse_u64_var("PUBLIC_KEY_FETCH_TIMEOUT_MS")?.unwrap_or(DEFAULT_FETCH_TIMEOUT_MS),
    );
    let key_cache_ttl = parse_u64_var("PUBLIC_KEY_CACHE_TTL_SECS")?
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    Ok(ServiceConfig {
        addr: SocketAddr::from((ip, port)),
        key_fetch_timeout,
        key_cache_ttl,
    })
}

fn parse_u64_var(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Failed to parse {key} '{value}'")),
        _ => Ok(None),
    }
}
