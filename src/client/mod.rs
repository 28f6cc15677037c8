//! Bitrix24 client
//!
//! `Bx24Client` is the entry point: every remote operation awaits the
//! readiness gate, goes through the `Transport`, and comes back normalized.
//!
//! # Example
//!
//! ```ignore
//! let client = Bx24Client::from_config(&Bx24Config::from_file("bx24.yaml")?)?;
//!
//! let deal = client.call_method("crm.deal.get", params).await?;
//! let contacts = client
//!     .fetch_all_by_id_cursor("crm.contact.list", JsonObject::new())
//!     .await?;
//! ```

mod batch;
mod options;

pub use batch::{encode_params, BatchCalls, BatchCommand, MAX_BATCH_COMMANDS};
pub use options::{OptionScope, Options};

use crate::auth::{AuthState, Authenticator};
use crate::bulk;
use crate::config::Bx24Config;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::result::{ApiResult, Normalizer, Query, RawResult, ResultSet, ThrowMode};
use crate::transport::{HttpTransport, Transport};
use crate::types::{JsonObject, JsonValue};
use futures::Stream;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Asynchronous Bitrix24 REST client
pub struct Bx24Client {
    /// Performs the remote calls
    transport: Arc<dyn Transport>,
    /// Token source, when calls are authorized by token
    auth: Option<Arc<Authenticator>>,
    /// REST endpoint, when known
    endpoint: Option<String>,
    /// Shared throw-mode setting
    throw_mode: ThrowMode,
    /// Readiness gate
    ready: OnceCell<()>,
}

impl Bx24Client {
    /// Create a client over any transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            auth: None,
            endpoint: None,
            throw_mode: ThrowMode::default(),
            ready: OnceCell::new(),
        }
    }

    /// Create an HTTPS client from configuration
    pub fn from_config(config: &Bx24Config) -> Result<Self> {
        config.validate()?;

        let http = HttpClient::with_config(config.http_client_config())?;
        let auth = Arc::new(Authenticator::with_client(
            config.auth.to_auth_config(),
            http.inner().clone(),
        ));
        let transport = HttpTransport::new(http, Arc::clone(&auth));

        let mut client = Self::new(Arc::new(transport))
            .with_authenticator(auth)
            .with_throw_errors(config.throw_errors);
        client.endpoint = Some(config.endpoint.clone());
        Ok(client)
    }

    /// Use `auth` for `get_auth`, `refresh_auth` and the readiness check
    #[must_use]
    pub fn with_authenticator(mut self, auth: Arc<Authenticator>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the initial throw-mode
    #[must_use]
    pub fn with_throw_errors(self, enabled: bool) -> Self {
        self.throw_mode.set(enabled);
        self
    }

    /// The underlying transport
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    // ========================================================================
    // Readiness
    // ========================================================================

    /// Run the one-time initialization.
    ///
    /// Concurrent callers wait for the same initialization; once it has
    /// succeeded this returns immediately. A failed initialization is retried
    /// by the next caller. For OAuth without a live access token the first
    /// token is fetched here.
    pub async fn init(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                if let Some(auth) = &self.auth {
                    if auth.config().is_refreshable() && !auth.has_valid_token().await {
                        info!("Fetching initial access token");
                        auth.refresh().await?;
                    }
                }
                debug!("Client ready");
                Ok::<(), Error>(())
            })
            .await
            .map(|_| ())
    }

    /// Whether `init` has completed
    pub fn is_init(&self) -> bool {
        self.ready.initialized()
    }

    // ========================================================================
    // Throw-mode
    // ========================================================================

    /// Whether embedded errors are returned as `Err`
    pub fn throw_errors(&self) -> bool {
        self.throw_mode.get()
    }

    /// Change throw-mode; affects normalizations that start afterwards
    pub fn set_throw_errors(&self, enabled: bool) {
        self.throw_mode.set(enabled);
    }

    fn normalizer(&self) -> Normalizer {
        self.throw_mode.normalizer()
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call one REST method
    pub async fn call_method(&self, method: &str, params: JsonObject) -> Result<ApiResult> {
        self.init().await?;
        let normalizer = self.normalizer();

        let body = self.transport.call(method, &params).await?;
        normalizer.normalize_one(RawResult::new(body, Some(Query::new(method, params))))
    }

    /// Run up to fifty calls in one `batch` request.
    ///
    /// The results keep the layout of `calls`: a list for a list, keyed by the
    /// same keys for a map. Every result can continue its own paging.
    pub async fn call_batch(&self, calls: BatchCalls, halt_on_error: bool) -> Result<ResultSet> {
        self.init().await?;
        let normalizer = self.normalizer();

        let params = batch::batch_params(&calls, halt_on_error)?;
        debug!("Calling batch of {} commands", calls.len());
        let body = self.transport.call("batch", &params).await?;
        normalizer.normalize(batch::unpack(body, calls))
    }

    /// Register an event handler (`event.bind`)
    pub async fn call_bind(
        &self,
        event: &str,
        handler: &str,
        auth_type: Option<u64>,
    ) -> Result<ApiResult> {
        self.call_method("event.bind", event_params(event, handler, auth_type))
            .await
    }

    /// Remove an event handler (`event.unbind`)
    pub async fn call_unbind(
        &self,
        event: &str,
        handler: &str,
        auth_type: Option<u64>,
    ) -> Result<ApiResult> {
        self.call_method("event.unbind", event_params(event, handler, auth_type))
            .await
    }

    /// Fetch the page after `result`; `None` without a call when there is none
    pub async fn fetch_next(&self, result: &ApiResult) -> Result<Option<ApiResult>> {
        self.init().await?;
        self.normalizer()
            .fetch_next(result, self.transport.as_ref())
            .await
    }

    // ========================================================================
    // Bulk
    // ========================================================================

    /// Fetch every record of a list method by scanning on `ID`
    pub async fn fetch_all_by_id_cursor(
        &self,
        method: &str,
        params: JsonObject,
    ) -> Result<Vec<JsonValue>> {
        self.init().await?;
        bulk::fetch_all_by_id_cursor(self.transport.as_ref(), self.normalizer(), method, params)
            .await
    }

    /// Fetch every record of a list method by following `next`
    pub async fn fetch_all_by_continuation(
        &self,
        method: &str,
        params: JsonObject,
    ) -> Result<Vec<JsonValue>> {
        self.init().await?;
        bulk::fetch_all_by_continuation(self.transport.as_ref(), self.normalizer(), method, params)
            .await
    }

    /// Stream the pages of a list method one at a time
    pub async fn pages<'a>(
        &'a self,
        method: &'a str,
        params: JsonObject,
    ) -> Result<impl Stream<Item = Result<ApiResult>> + 'a> {
        self.init().await?;
        Ok(bulk::pages(
            self.transport.as_ref(),
            self.normalizer(),
            method,
            params,
        ))
    }

    // ========================================================================
    // Auth and portal info
    // ========================================================================

    /// Current authorization, if calls are token-authorized
    pub async fn get_auth(&self) -> Option<AuthState> {
        self.init().await.ok()?;
        self.auth.as_ref()?.current().await
    }

    /// Force a token refresh
    pub async fn refresh_auth(&self) -> Result<AuthState> {
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| Error::auth("client has no authenticator"))?;
        auth.refresh().await
    }

    /// Portal domain, from the authorization or the endpoint
    pub async fn get_domain(&self) -> Option<String> {
        if let Some(domain) = self.get_auth().await.and_then(|a| a.domain) {
            return Some(domain);
        }
        let endpoint = url::Url::parse(self.endpoint.as_deref()?).ok()?;
        endpoint.host_str().map(str::to_string)
    }

    /// Whether the current user is a portal administrator (`user.admin`)
    pub async fn is_admin(&self) -> Result<bool> {
        let result = self.call_method("user.admin", JsonObject::new()).await?;
        Ok(is_truthy(&result.into_result()?))
    }

    /// Options private to the current user
    pub fn user_option(&self) -> Options<'_> {
        Options::new(self, OptionScope::User)
    }

    /// Options shared across the application
    pub fn app_option(&self) -> Options<'_> {
        Options::new(self, OptionScope::App)
    }
}

impl std::fmt::Debug for Bx24Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bx24Client")
            .field("endpoint", &self.endpoint)
            .field("throw_errors", &self.throw_errors())
            .field("ready", &self.is_init())
            .finish_non_exhaustive()
    }
}

fn event_params(event: &str, handler: &str, auth_type: Option<u64>) -> JsonObject {
    let mut params = JsonObject::new();
    params.insert("event".to_string(), Value::from(event));
    params.insert("handler".to_string(), Value::from(handler));
    if let Some(user) = auth_type {
        params.insert("auth_type".to_string(), Value::from(user));
    }
    params
}

/// The portal answers flags as `true`, `1`, `"Y"` or `"1"`
fn is_truthy(value: &JsonValue) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.as_str(), "Y" | "y" | "1" | "true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests;
