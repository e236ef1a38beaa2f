/// Configuration management for the Mahakim proxy
use crate::{
    crypto::keys::{CryptoKeyPair, DEFAULT_IV_B64, DEFAULT_KEY_B64},
    error::{ProxyError, ProxyResult},
};
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub upstream: UpstreamConfig,
    pub crypto: CryptoConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Mahakim middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL; `/SuiviDossiers/<endpoint>` is appended
    pub base_url: String,
    /// Per-call network timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    pub referer: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.mahakim.ma/middleware/api".to_string(),
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string(),
            referer: "https://www.mahakim.ma/".to_string(),
        }
    }
}

/// Initial key pair (base64)
#[derive(Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    pub key: String,
    pub iv: String,
}

impl std::fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoConfig").finish_non_exhaustive()
    }
}

impl CryptoConfig {
    /// Decode and validate the configured pair
    pub fn key_pair(&self) -> ProxyResult<CryptoKeyPair> {
        Ok(CryptoKeyPair::from_base64(&self.key, &self.iv)?)
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Interval between sweeps of expired entries, in seconds
    pub cleanup_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ProxyResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("PROXY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_setting(env::var("PROXY_PORT").ok(), "8000", "Invalid port number")?;

        let defaults = UpstreamConfig::default();
        let base_url = env::var("MAHAKIM_BASE_URL").unwrap_or(defaults.base_url);
        let timeout_secs = parse_setting(
            env::var("UPSTREAM_TIMEOUT_SECS").ok(),
            "30",
            "Invalid upstream timeout",
        )?;
        let user_agent = env::var("UPSTREAM_USER_AGENT").unwrap_or(defaults.user_agent);
        let referer = env::var("UPSTREAM_REFERER").unwrap_or(defaults.referer);

        let key = env::var("CRYPTO_KEY").unwrap_or_else(|_| DEFAULT_KEY_B64.to_string());
        let iv = env::var("CRYPTO_IV").unwrap_or_else(|_| DEFAULT_IV_B64.to_string());

        let cleanup_interval_secs = parse_setting(
            env::var("CACHE_CLEANUP_INTERVAL_SECS").ok(),
            "3600",
            "Invalid cache cleanup interval",
        )?;

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            upstream: UpstreamConfig {
                base_url,
                timeout_secs,
                user_agent,
                referer,
            },
            crypto: CryptoConfig { key, iv },
            cache: CacheConfig {
                cleanup_interval_secs,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ProxyResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ProxyError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ProxyError::Validation(
                "Upstream timeout must be at least one second".to_string(),
            ));
        }

        if !(self.upstream.base_url.starts_with("http://")
            || self.upstream.base_url.starts_with("https://"))
        {
            return Err(ProxyError::Validation(format!(
                "Upstream base URL must be http(s): {}",
                self.upstream.base_url
            )));
        }

        if self.cache.cleanup_interval_secs == 0 {
            return Err(ProxyError::Validation(
                "Cache cleanup interval must be at least one second".to_string(),
            ));
        }

        self.crypto.key_pair()?;

        Ok(())
    }
}

/// Parse a numeric setting, falling back to `default` only when unset
fn parse_setting<T: FromStr>(raw: Option<String>, default: &str, message: &str) -> ProxyResult<T> {
    let value = raw.unwrap_or_else(|| default.to_string());
    value
        .trim()
        .parse()
        .map_err(|_| ProxyError::Validation(format!("{}: {:?}", message, value)))
}

#[cfg(test)]
impl ServerConfig {
    /// Defaults without touching the environment
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
            },
            upstream: UpstreamConfig {
                base_url: "http://mahakim.test/middleware/api".to_string(),
                ..UpstreamConfig::default()
            },
            crypto: CryptoConfig {
                key: DEFAULT_KEY_B64.to_string(),
                iv: DEFAULT_IV_B64.to_string(),
            },
            cache: CacheConfig {
                cleanup_interval_secs: 3600,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }
}
