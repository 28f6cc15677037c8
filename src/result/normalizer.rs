//! Result normalization
//!
//! Parses raw envelopes into `ApiResult`s shape by shape and, in throw-mode,
//! turns embedded errors into `Err`. Continuations are plain data on the
//! result, so following one and normalizing the reply never nests anything:
//! every page is normalized exactly once, however it was reached.

use super::shape::Shape;
use super::types::{ApiResult, Query, RawResult};
use crate::error::{Error, Result};
use crate::transport::Transport;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Normalizes raw responses with a fixed throw-mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    throw_errors: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { throw_errors: true }
    }
}

impl Normalizer {
    pub fn new(throw_errors: bool) -> Self {
        Self { throw_errors }
    }

    /// Whether embedded errors are returned as `Err`
    pub fn throw_errors(&self) -> bool {
        self.throw_errors
    }

    /// Normalize every element, keeping the shape
    pub fn normalize(&self, raw: Shape<RawResult>) -> Result<Shape<ApiResult>> {
        raw.try_map(|r| self.normalize_one(r))
    }

    /// Normalize a single envelope
    pub fn normalize_one(&self, raw: RawResult) -> Result<ApiResult> {
        let result = ApiResult::from_raw(raw);

        if self.throw_errors {
            if let Some(err) = result.error() {
                error!(
                    method = result.query().map_or("", |q| q.method.as_str()),
                    result = ?result,
                    error = %err,
                    "Bitrix24 call returned an error"
                );
                return Err(err.clone().into());
            }
        }

        Ok(result)
    }

    /// Classify a free-form JSON response, then normalize it.
    ///
    /// `query` is attached only when the value turns out to be a single
    /// envelope; list and map elements have no known originating call.
    pub fn normalize_value(&self, value: Value, query: Option<Query>) -> Result<Shape<ApiResult>> {
        let raw = match Shape::classify(value) {
            Shape::Single(body) => Shape::Single(RawResult::new(body, query)),
            other => other.map(|body| RawResult::new(body, None)),
        };
        self.normalize(raw)
    }

    /// Normalize an already normalized result again.
    ///
    /// Yields an equal result; only the throw-mode check is re-applied.
    pub fn renormalize(&self, result: ApiResult) -> Result<ApiResult> {
        self.normalize_one(result.to_raw())
    }

    /// Fetch and normalize the page after `result`.
    ///
    /// Returns `Ok(None)` without calling the transport when there are no more
    /// pages. Otherwise issues exactly one call.
    pub async fn fetch_next<T>(&self, result: &ApiResult, transport: &T) -> Result<Option<ApiResult>>
    where
        T: Transport + ?Sized,
    {
        if !result.has_more() {
            return Ok(None);
        }

        let query = result.continuation().ok_or_else(|| {
            Error::unexpected(
                "<unknown>",
                "result reports more pages but carries no originating call",
            )
        })?;

        debug!(
            "Fetching next page of {} from offset {:?}",
            query.method,
            result.next_start()
        );

        let body = transport.call(&query.method, &query.params).await?;
        self.normalize_one(RawResult::new(body, Some(query))).map(Some)
    }
}

/// Shared, adjustable throw-mode setting.
///
/// Each operation snapshots it into a `Normalizer` before normalizing, so a
/// change only affects operations that start normalizing afterwards.
#[derive(Debug, Clone)]
pub struct ThrowMode {
    enabled: Arc<AtomicBool>,
}

impl Default for ThrowMode {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ThrowMode {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn get(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Snapshot the current setting
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.get())
    }
}
