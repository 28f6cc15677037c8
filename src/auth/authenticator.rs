//! Authenticator implementation
//!
//! Supplies the `auth` request parameter and manages token refresh.

use super::types::{AuthConfig, AuthState};
use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Authenticator hands out access tokens, refreshing them when needed
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Current authorization for OAuth
    state: Arc<RwLock<Option<AuthState>>>,
    /// HTTP client for token requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        let initial = match &config {
            AuthConfig::AccessToken { token } => Some(AuthState::new(token.clone(), None)),
            AuthConfig::OAuth {
                access_token: Some(token),
                refresh_token,
                expires_at,
                ..
            } => {
                let mut state = AuthState::new(token.clone(), *expires_at);
                state.refresh_token = Some(refresh_token.clone());
                Some(state)
            }
            _ => None,
        };

        Self {
            config,
            state: Arc::new(RwLock::new(initial)),
            http_client,
        }
    }

    /// Token to send as the `auth` parameter, refreshing if necessary.
    ///
    /// Returns `None` when the config carries no token (webhooks).
    pub async fn access_token(&self) -> Result<Option<String>> {
        match &self.config {
            AuthConfig::None => Ok(None),
            AuthConfig::AccessToken { token } => Ok(Some(token.clone())),
            AuthConfig::OAuth { .. } => {
                {
                    let state = self.state.read().await;
                    if let Some(current) = state.as_ref() {
                        if !current.is_expired() {
                            return Ok(Some(current.access_token.clone()));
                        }
                    }
                }

                let mut state = self.state.write().await;

                // Another task may have refreshed while we waited for the lock
                if let Some(current) = state.as_ref() {
                    if !current.is_expired() {
                        return Ok(Some(current.access_token.clone()));
                    }
                }

                let fresh = self.fetch_refreshed(state.as_ref()).await?;
                let token = fresh.access_token.clone();
                *state = Some(fresh);
                Ok(Some(token))
            }
        }
    }

    /// Whether a usable token is already held
    pub async fn has_valid_token(&self) -> bool {
        match &self.config {
            AuthConfig::None | AuthConfig::AccessToken { .. } => true,
            AuthConfig::OAuth { .. } => self
                .state
                .read()
                .await
                .as_ref()
                .is_some_and(|s| !s.is_expired()),
        }
    }

    /// Force a token refresh regardless of expiry
    pub async fn refresh(&self) -> Result<AuthState> {
        let mut state = self.state.write().await;
        let fresh = self.fetch_refreshed(state.as_ref()).await?;
        *state = Some(fresh.clone());
        Ok(fresh)
    }

    /// Snapshot of the current authorization, if any
    pub async fn current(&self) -> Option<AuthState> {
        self.state.read().await.clone()
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    async fn fetch_refreshed(&self, previous: Option<&AuthState>) -> Result<AuthState> {
        let AuthConfig::OAuth {
            token_url,
            client_id,
            client_secret,
            refresh_token,
            ..
        } = &self.config
        else {
            return Err(Error::auth(
                "Token refresh not supported for this auth type",
            ));
        };

        // Refresh tokens rotate, so prefer the one from the last refresh
        let refresh_token = previous
            .and_then(|s| s.refresh_token.as_deref())
            .unwrap_or(refresh_token);

        debug!("Refreshing access token via {token_url}");

        let query = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .http_client
            .get(token_url)
            .query(&query)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenRefresh {
                message: format!("Refresh token request failed with status {status}: {body}"),
            });
        }

        let token_response: TokenResponse = response.json().await.map_err(Error::Http)?;
        token_response.into_auth_state()
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("refreshable", &self.config.is_refreshable())
            .finish_non_exhaustive()
    }
}

/// Bitrix24 OAuth token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    member_id: Option<String>,
    #[serde(default)]
    client_endpoint: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_auth_state(self) -> Result<AuthState> {
        if let Some(error) = self.error {
            return Err(Error::TokenRefresh {
                message: format!(
                    "{error}: {}",
                    self.error_description.unwrap_or_default()
                ),
            });
        }

        let access_token = self.access_token.ok_or_else(|| Error::TokenRefresh {
            message: "Token response has no access_token".to_string(),
        })?;

        let mut state = match self.expires_in {
            Some(secs) => AuthState::expires_in(access_token, secs),
            None => AuthState::new(access_token, None),
        };
        state.refresh_token = self.refresh_token;
        state.domain = self.domain;
        state.member_id = self.member_id;
        state.client_endpoint = self.client_endpoint;
        Ok(state)
    }
}
