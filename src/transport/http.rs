//! HTTPS transport for the Bitrix24 REST API

use super::Transport;
use crate::auth::Authenticator;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Posts calls to `{endpoint}/{method}.json`
#[derive(Debug)]
pub struct HttpTransport {
    http: HttpClient,
    auth: Arc<Authenticator>,
}

impl HttpTransport {
    /// Create a transport; the client's base URL is the REST endpoint
    pub fn new(http: HttpClient, auth: Arc<Authenticator>) -> Self {
        Self { http, auth }
    }

    /// The authenticator used for the `auth` parameter
    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.auth
    }

    async fn post(&self, method: &str, params: &JsonObject) -> Result<JsonValue> {
        let mut body = params.clone();
        if let Some(token) = self.auth.access_token().await? {
            body.insert("auth".to_string(), Value::String(token));
        }

        match self
            .http
            .post_json::<Value>(&format!("{method}.json"), &Value::Object(body))
            .await
        {
            Ok(envelope) => Ok(envelope),
            Err(Error::HttpStatus { status, body }) => error_envelope(status, &body)
                .ok_or(Error::HttpStatus { status, body }),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, params: &JsonObject) -> Result<JsonValue> {
        debug!("Calling {method}");
        let envelope = self.post(method, params).await?;

        if is_expired_token(&envelope) && self.auth.config().is_refreshable() {
            warn!("Access token expired while calling {method}, refreshing");
            self.auth.refresh().await?;
            return self.post(method, params).await;
        }

        Ok(envelope)
    }
}

/// Recover the error envelope from a failed HTTP response
fn error_envelope(status: u16, body: &str) -> Option<JsonValue> {
    let mut value: Value = serde_json::from_str(body).ok()?;
    let map = value.as_object_mut()?;
    if !map.contains_key("error") {
        return None;
    }
    map.insert("status".to_string(), Value::from(status));
    Some(value)
}

fn is_expired_token(envelope: &JsonValue) -> bool {
    envelope.get("error").and_then(Value::as_str) == Some("expired_token")
}
