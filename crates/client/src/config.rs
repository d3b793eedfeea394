//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `CABLESTORE_API_BASE_URL` - Backend base URL (default: `http://localhost:8000/api/v1`)
//! - `CABLESTORE_REQUEST_TIMEOUT_SECS` - Per-attempt timeout, 5-15 (default: 10)
//! - `CABLESTORE_MAX_RETRIES` - Retry bound for transient failures (default: 3)
//! - `CABLESTORE_RETRY_BASE_DELAY_MS` - Linear backoff unit (default: 1000)
//! - `CABLESTORE_CATALOG_TTL_SECS` - Catalog cache lifetime (default: unset, never expires)

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
const MIN_TIMEOUT_SECS: u64 = 5;
const MAX_TIMEOUT_SECS: u64 = 15;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend API base URL, e.g. `https://shop.example.com/api/v1`
    pub base_url: Url,
    /// How long a single attempt may stay pending
    pub request_timeout: Duration,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
    /// Catalog cache time-to-live; `None` keeps it for the process lifetime
    pub catalog_ttl: Option<Duration>,
}

/// Retry settings for network failures and 5xx responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of resubmissions after the first attempt
    pub max_retries: u32,
    /// Delay unit; retry `n` waits `n * base_delay`
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
            catalog_ttl: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = match lookup("CABLESTORE_API_BASE_URL") {
            Some(raw) => parse_base_url("CABLESTORE_API_BASE_URL", &raw)?,
            None => default_base_url(),
        };

        let timeout_secs = parse_or("CABLESTORE_REQUEST_TIMEOUT_SECS", &lookup, 10_u64)?;
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(ConfigError::InvalidEnvVar(
                "CABLESTORE_REQUEST_TIMEOUT_SECS".to_string(),
                format!("must be between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS} seconds"),
            ));
        }

        let retry = RetryConfig {
            max_retries: parse_or("CABLESTORE_MAX_RETRIES", &lookup, 3_u32)?,
            base_delay: Duration::from_millis(parse_or(
                "CABLESTORE_RETRY_BASE_DELAY_MS",
                &lookup,
                1000_u64,
            )?),
        };

        let catalog_ttl = lookup("CABLESTORE_CATALOG_TTL_SECS")
            .map(|raw| parse_value::<u64>("CABLESTORE_CATALOG_TTL_SECS", &raw))
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            retry,
            catalog_ttl,
        })
    }

    /// Absolute URL for an API path such as `/cart/` or `cart/12`.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        // Url::join drops the last segment unless the base ends with '/'
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        base.join(path.trim_start_matches('/'))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

// Constant literal; parse failure is covered by test_defaults_when_nothing_set
fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

/// Parse and validate the API base URL.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Parse a value, or fall back to a default when the key is absent.
fn parse_or<T>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
