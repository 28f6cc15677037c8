//! Transport module
//!
//! A transport performs one remote call and hands back the raw response
//! envelope. Everything above it (normalization, batching, bulk fetching) is
//! transport-agnostic.
//!
//! - `HttpTransport` - posts to a portal's REST endpoint over HTTPS
//! - `InMemoryTransport` - answers from a handler or a script of responses

mod http;
mod memory;

pub use http::HttpTransport;
pub use memory::InMemoryTransport;

use crate::error::Result;
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use std::sync::Arc;

/// Performs remote calls
#[async_trait]
pub trait Transport: Send + Sync {
    /// Call `method` with `params` and return the raw response envelope.
    ///
    /// Errors reported by the portal inside a response body are returned as
    /// `Ok` envelopes carrying `error`; only transport failures are `Err`.
    async fn call(&self, method: &str, params: &JsonObject) -> Result<JsonValue>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn call(&self, method: &str, params: &JsonObject) -> Result<JsonValue> {
        (**self).call(method, params).await
    }
}
