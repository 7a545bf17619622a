//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PETALPOST_API_BASE_URL` - Base URL of the remote store API
//!
//! ## Optional
//! - `PETALPOST_SUBMIT_TIMEOUT_SECS` - Order submission timeout (default: 30)
//! - `PETALPOST_RECONCILE_DELAY_MS` - Delay before the post-mutation cart
//!   refresh that reconciles server-side side effects (default: 1500)

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront engine configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the remote store API.
    pub api_base_url: Url,
    /// Client-side timeout raced against order submission.
    pub submit_timeout: Duration,
    /// Delay before the deferred full-cart refresh after a mutation.
    pub reconcile_delay: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("PETALPOST_API_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PETALPOST_API_BASE_URL".to_string(), e.to_string())
            })?;
        let submit_timeout_secs = get_env_or_default("PETALPOST_SUBMIT_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "PETALPOST_SUBMIT_TIMEOUT_SECS".to_string(),
                    e.to_string(),
                )
            })?;
        let reconcile_delay_ms = get_env_or_default("PETALPOST_RECONCILE_DELAY_MS", "1500")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "PETALPOST_RECONCILE_DELAY_MS".to_string(),
                    e.to_string(),
                )
            })?;

        Ok(Self {
            api_base_url,
            submit_timeout: Duration::from_secs(submit_timeout_secs),
            reconcile_delay: Duration::from_millis(reconcile_delay_ms),
        })
    }

    /// Configuration with the given base URL and default timings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL does not parse.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let api_base_url = base_url.parse::<Url>().map_err(|e| {
            ConfigError::InvalidEnvVar("PETALPOST_API_BASE_URL".to_string(), e.to_string())
        })?;
        Ok(Self {
            api_base_url,
            submit_timeout: Duration::from_secs(30),
            reconcile_delay: Duration::from_millis(1500),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_url_defaults() {
        let config = StorefrontConfig::with_base_url("https://api.petalpost.example").unwrap();
        assert_eq!(config.submit_timeout, Duration::from_secs(30));
        assert_eq!(config.reconcile_delay, Duration::from_millis(1500));
        assert_eq!(config.api_base_url.host_str(), Some("api.petalpost.example"));
    }

    #[test]
    fn test_with_base_url_rejects_garbage() {
        let result = StorefrontConfig::with_base_url("not a url");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_get_env_or_default_falls_back() {
        assert_eq!(
            get_env_or_default("PETALPOST_TEST_UNSET_VARIABLE", "fallback"),
            "fallback"
        );
    }
}
