//! Auth configuration types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default Bitrix24 OAuth server used to refresh tokens
pub const DEFAULT_TOKEN_URL: &str = "https://oauth.bitrix.info/oauth/token/";

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No auth parameter is sent (incoming webhooks carry the secret in the URL)
    #[default]
    None,

    /// Fixed access token sent as the `auth` parameter, never refreshed
    AccessToken {
        /// The access token
        token: String,
    },

    /// Application OAuth with refresh support
    OAuth {
        /// OAuth token endpoint
        token_url: String,
        /// Application client ID
        client_id: String,
        /// Application client secret
        client_secret: String,
        /// Refresh token issued with the initial authorization
        refresh_token: String,
        /// Access token known at startup, if any
        access_token: Option<String>,
        /// Expiry of `access_token`
        expires_at: Option<DateTime<Utc>>,
    },
}

impl AuthConfig {
    /// Create an OAuth config against the default token endpoint
    pub fn oauth(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self::OAuth {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            access_token: None,
            expires_at: None,
        }
    }

    /// Whether tokens for this config can be refreshed
    pub fn is_refreshable(&self) -> bool {
        matches!(self, Self::OAuth { .. })
    }
}

/// Snapshot of the current authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// The access token
    pub access_token: String,
    /// Refresh token (rotated on every refresh)
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the access token expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Portal domain
    #[serde(default)]
    pub domain: Option<String>,
    /// Portal member id
    #[serde(default)]
    pub member_id: Option<String>,
    /// REST endpoint for this portal
    #[serde(default)]
    pub client_endpoint: Option<String>,
}

impl AuthState {
    /// Create a new auth state
    pub fn new(access_token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at,
            domain: None,
            member_id: None,
            client_endpoint: None,
        }
    }

    /// Create a state whose token expires in N seconds from now
    pub fn expires_in(access_token: String, seconds: i64) -> Self {
        Self::new(
            access_token,
            Some(Utc::now() + chrono::Duration::seconds(seconds)),
        )
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_auth_state_not_expired() {
        let state = AuthState::expires_in("test".to_string(), 3600);
        assert!(!state.is_expired());
    }

    #[test]
    fn test_auth_state_expired() {
        let state = AuthState::expires_in("test".to_string(), -100);
        assert!(state.is_expired());
    }

    #[test]
    fn test_auth_state_no_expiration() {
        let state = AuthState::new("test".to_string(), None);
        assert!(!state.is_expired());
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(matches!(config, AuthConfig::None));
        assert!(!config.is_refreshable());
        assert!(AuthConfig::oauth("id", "secret", "refresh").is_refreshable());
    }
}
