//! In-memory transport
//!
//! Answers calls from a handler function and records every call made, which
//! makes it a drop-in stand-in for a portal in tests and dry runs.

use super::Transport;
use crate::error::{Error, Result};
use crate::result::Query;
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

type Handler = Box<dyn Fn(&str, &JsonObject) -> Result<JsonValue> + Send + Sync>;

/// Transport backed by a handler function
pub struct InMemoryTransport {
    handler: Handler,
    calls: Mutex<Vec<Query>>,
}

impl InMemoryTransport {
    /// Answer every call with `handler(method, params)`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &JsonObject) -> Result<JsonValue> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer calls with the given envelopes, in order.
    ///
    /// A call after the script is exhausted fails.
    pub fn scripted(responses: Vec<JsonValue>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |method, _| {
            queue
                .lock()
                .map_err(|_| Error::Other("response script lock poisoned".to_string()))?
                .pop_front()
                .ok_or_else(|| Error::unexpected(method, "no scripted response left"))
        })
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<Query> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn call(&self, method: &str, params: &JsonObject) -> Result<JsonValue> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Query::new(method, params.clone()));
        }
        (self.handler)(method, params)
    }
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}
