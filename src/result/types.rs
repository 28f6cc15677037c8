//! Result types
//!
//! `RawResult` is one response envelope as it came off the wire together with
//! the call that produced it. `ApiResult` is the parsed, immutable form.

use crate::error::Error;
use crate::types::{JsonObject, JsonValue};
use serde_json::{json, Value};
use std::fmt;

/// The remote call that produced a result
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// REST method name, e.g. `crm.deal.list`
    pub method: String,
    /// Parameters the method was called with
    pub params: JsonObject,
}

impl Query {
    pub fn new(method: impl Into<String>, params: JsonObject) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// The same call with `start` set to the given offset
    pub fn with_start(&self, start: u64) -> Self {
        let mut params = self.params.clone();
        params.insert("start".to_string(), json!(start));
        Self {
            method: self.method.clone(),
            params,
        }
    }
}

/// One raw response envelope
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    /// Envelope body (`result`, `error`, `next`, `total`, `time`)
    pub body: JsonValue,
    /// Originating call, used to build the continuation
    pub query: Option<Query>,
}

impl RawResult {
    pub fn new(body: JsonValue, query: Option<Query>) -> Self {
        Self { body, query }
    }

    /// Attach the HTTP status an error envelope arrived with
    pub fn with_status(mut self, status: u16) -> Self {
        if let Value::Object(map) = &mut self.body {
            map.insert("status".to_string(), json!(status));
        }
        self
    }
}

/// Error descriptor embedded in a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Platform error code, e.g. `ACCESS_DENIED`
    pub code: String,
    /// Human-readable description
    pub description: String,
    /// HTTP status the error arrived with, when known
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            status: None,
        }
    }

    /// Parse the `error` / `error_description` pair of an envelope
    pub fn from_envelope(body: &JsonObject) -> Option<Self> {
        let description = body
            .get("error_description")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match body.get("error")? {
            Value::Null => None,
            Value::String(code) if code.is_empty() => None,
            Value::String(code) => Some(Self::new(code.clone(), description)),
            Value::Object(inner) => {
                let code = inner
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("UNKNOWN_ERROR");
                let description = inner
                    .get("error_description")
                    .and_then(Value::as_str)
                    .unwrap_or(description);
                Some(Self::new(code, description))
            }
            other => Some(Self::new(other.to_string(), description)),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::Api {
            code: err.code,
            description: err.description,
            status: err.status,
        }
    }
}

/// Normalized outcome of one remote call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult {
    data: JsonValue,
    error: Option<ApiError>,
    total: Option<u64>,
    next: Option<u64>,
    time: Option<JsonValue>,
    query: Option<Query>,
}

impl ApiResult {
    /// Parse a raw envelope
    pub fn from_raw(raw: RawResult) -> Self {
        let RawResult { body, query } = raw;

        let Value::Object(mut map) = body else {
            return Self {
                data: body,
                error: None,
                total: None,
                next: None,
                time: None,
                query,
            };
        };

        let status = map
            .remove("status")
            .and_then(|v| as_u64(&v))
            .and_then(|s| u16::try_from(s).ok());
        let error = ApiError::from_envelope(&map).map(|mut e| {
            e.status = status;
            e
        });
        let total = map.get("total").and_then(as_u64);
        let next = map.get("next").and_then(as_u64);
        let time = map.remove("time");
        let data = map.remove("result").unwrap_or(Value::Null);

        Self {
            data,
            error,
            total,
            next,
            time,
            query,
        }
    }

    /// Build a successful single-page result
    pub fn ok(data: JsonValue) -> Self {
        Self::from_raw(RawResult::new(json!({ "result": data }), None))
    }

    /// Rebuild the raw form this result was parsed from
    pub fn to_raw(&self) -> RawResult {
        let mut body = JsonObject::new();
        body.insert("result".to_string(), self.data.clone());
        if let Some(err) = &self.error {
            body.insert("error".to_string(), json!(err.code));
            body.insert("error_description".to_string(), json!(err.description));
        }
        if let Some(total) = self.total {
            body.insert("total".to_string(), json!(total));
        }
        if let Some(next) = self.next {
            body.insert("next".to_string(), json!(next));
        }
        if let Some(time) = &self.time {
            body.insert("time".to_string(), time.clone());
        }
        let mut raw = RawResult::new(Value::Object(body), self.query.clone());
        if let Some(status) = self.error.as_ref().and_then(|e| e.status) {
            raw = raw.with_status(status);
        }
        raw
    }

    /// Response payload
    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    pub fn into_data(self) -> JsonValue {
        self.data
    }

    /// Embedded error, if the call failed
    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Total number of records, reported only for paged calls
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Whether another page is available
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Offset of the next page
    pub fn next_start(&self) -> Option<u64> {
        self.next
    }

    /// Timing block echoed by the portal
    pub fn time(&self) -> Option<&JsonValue> {
        self.time.as_ref()
    }

    /// The call that produced this result
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// The call that fetches the next page, if there is one
    pub fn continuation(&self) -> Option<Query> {
        let next = self.next?;
        self.query.as_ref().map(|q| q.with_start(next))
    }

    /// Payload on success, embedded error otherwise
    pub fn into_result(self) -> crate::error::Result<JsonValue> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.data),
        }
    }

    /// Records carried by this page.
    ///
    /// Arrays are used as-is. An object whose only array-valued member is
    /// the list (`{"tasks": [...]}`, or `{"items": [...], "hasMore": true}`
    /// from newer methods) yields that array. `null` is an empty page; any
    /// other payload is one record.
    pub fn records(&self) -> Vec<JsonValue> {
        match &self.data {
            Value::Null => Vec::new(),
            Value::Array(items) => items.clone(),
            Value::Object(map) => {
                let mut arrays = map.values().filter_map(Value::as_array);
                match (arrays.next(), arrays.next()) {
                    (Some(items), None) => items.clone(),
                    _ => vec![self.data.clone()],
                }
            }
            other => vec![other.clone()],
        }
    }
}

/// Numbers arrive both as JSON numbers and numeric strings
pub(crate) fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
