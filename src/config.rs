//! Client configuration
//!
//! A `Bx24Config` is loaded from a YAML or JSON file and can be overridden
//! from the environment:
//!
//! ```yaml
//! endpoint: https://example.bitrix24.ru/rest/1/0123456789abcdef/
//! throw_errors: true
//! auth:
//!   type: oauth
//!   client_id: local.6543210.abcdef
//!   client_secret: secret
//!   refresh_token: 5ae2f1c0000d7e4f
//! http:
//!   timeout_seconds: 30
//!   rate_limit:
//!     requests_per_second: 2
//!     burst_size: 50
//! ```

use crate::auth::{AuthConfig, DEFAULT_TOKEN_URL};
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::types::{BackoffType, OptionStringExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `endpoint`
pub const ENV_WEBHOOK_URL: &str = "BX24_WEBHOOK_URL";
/// Environment variable switching auth to a fixed access token
pub const ENV_ACCESS_TOKEN: &str = "BX24_ACCESS_TOKEN";
/// Environment variable overriding `throw_errors`
pub const ENV_THROW_ERRORS: &str = "BX24_THROW_ERRORS";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bx24Config {
    /// REST endpoint: an incoming webhook URL or `https://<portal>/rest/`
    #[serde(alias = "webhook_url")]
    pub endpoint: String,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthSection,

    /// Whether embedded platform errors are returned as `Err`
    #[serde(default = "default_true")]
    pub throw_errors: bool,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_true() -> bool {
    true
}

impl Bx24Config {
    /// Config for an endpoint with default settings
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth: AuthSection::default(),
            throw_errors: true,
            http: HttpConfig::default(),
        }
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound {
                path: path.display().to_string(),
            },
            _ => Error::Io(e),
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from the environment alone
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from a variable lookup alone
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(ENV_WEBHOOK_URL)
            .none_if_empty()
            .ok_or_else(|| Error::missing_field(ENV_WEBHOOK_URL))?;
        let mut config = Self::new(endpoint);
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the environment
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_WEBHOOK_URL).none_if_empty() {
            self.endpoint = endpoint;
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN).none_if_empty() {
            self.auth = AuthSection::AccessToken { token };
        }
        if let Some(flag) = lookup(ENV_THROW_ERRORS).none_if_empty() {
            self.throw_errors = !matches!(flag.to_lowercase().as_str(), "0" | "false" | "no" | "off");
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::missing_field("endpoint"));
        }
        url::Url::parse(&self.endpoint)?;

        if let AuthSection::OAuth {
            client_id,
            refresh_token,
            ..
        } = &self.auth
        {
            if client_id.is_empty() {
                return Err(Error::missing_field("auth.client_id"));
            }
            if refresh_token.is_empty() {
                return Err(Error::missing_field("auth.refresh_token"));
            }
        }

        if self.http.rate_limit.requests_per_second == 0 {
            return Err(Error::config("http.rate_limit.requests_per_second must be positive"));
        }
        Ok(())
    }

    /// HTTP client settings rooted at the endpoint
    pub fn http_client_config(&self) -> HttpClientConfig {
        self.http.to_client_config(&self.endpoint)
    }
}

// ============================================================================
// Auth Config
// ============================================================================

/// Authentication section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthSection {
    /// Incoming webhook: the secret is part of the endpoint
    #[default]
    None,

    /// Fixed access token
    AccessToken {
        /// The access token
        token: String,
    },

    /// Application OAuth
    #[serde(rename = "oauth")]
    OAuth {
        /// Application client ID
        client_id: String,
        /// Application client secret
        client_secret: String,
        /// Refresh token
        refresh_token: String,
        /// Access token known at startup
        #[serde(default)]
        access_token: Option<String>,
        /// OAuth token endpoint
        #[serde(default = "default_token_url")]
        token_url: String,
    },
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

impl AuthSection {
    /// Convert to the authenticator's config
    pub fn to_auth_config(&self) -> AuthConfig {
        match self {
            Self::None => AuthConfig::None,
            Self::AccessToken { token } => AuthConfig::AccessToken {
                token: token.clone(),
            },
            Self::OAuth {
                client_id,
                client_secret,
                refresh_token,
                access_token,
                token_url,
            } => AuthConfig::OAuth {
                token_url: token_url.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                refresh_token: refresh_token.clone(),
                access_token: access_token.clone().none_if_empty(),
                expires_at: None,
            },
        }
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl HttpConfig {
    /// Build the client config for `endpoint`
    pub fn to_client_config(&self, endpoint: &str) -> HttpClientConfig {
        let builder = HttpClientConfig::builder()
            .base_url(endpoint)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .max_retries(self.max_retries)
            .backoff(
                self.retry_backoff.backoff_type,
                Duration::from_millis(self.retry_backoff.initial_ms),
                Duration::from_millis(self.retry_backoff.max_ms),
            );

        if self.rate_limit.enabled {
            builder
                .rate_limit(RateLimiterConfig::new(
                    self.rate_limit.requests_per_second,
                    self.rate_limit.burst_size,
                ))
                .build()
        } else {
            builder.no_rate_limit().build()
        }
    }
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::default(),
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    500
}

fn default_max_ms() -> u64 {
    60_000
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether requests are throttled client-side
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sustained requests per second
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Requests allowed in a burst
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: default_rps(),
            burst_size: default_burst(),
        }
    }
}

fn default_rps() -> u32 {
    2
}

fn default_burst() -> u32 {
    50
}
