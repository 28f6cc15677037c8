//! Batch calls
//!
//! The platform's `batch` method runs up to fifty commands in one request.
//! Each command travels as `method?query`, with the params flattened into
//! PHP-style form fields (`filter[>ID]=5&select[0]=ID`). The reply holds one
//! slot per command in each of `result`, `result_error`, `result_total`,
//! `result_next` and `result_time`, keyed the same way as `cmd`.

use crate::error::{Error, Result};
use crate::result::{Query, RawResult, Shape};
use crate::types::{JsonObject, JsonValue};
use serde_json::{json, Value};
use url::form_urlencoded;

/// Most commands the platform accepts in one batch
pub const MAX_BATCH_COMMANDS: usize = 50;

/// One command of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCommand {
    pub method: String,
    pub params: JsonObject,
}

impl BatchCommand {
    pub fn new(method: impl Into<String>, params: JsonObject) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// The `method?query` form used in `cmd`
    pub fn encode(&self) -> String {
        let query = encode_params(&self.params);
        if query.is_empty() {
            self.method.clone()
        } else {
            format!("{}?{query}", self.method)
        }
    }

    fn into_query(self) -> Query {
        Query::new(self.method, self.params)
    }
}

/// Commands of a batch, as an ordered list or under caller-chosen keys
#[derive(Debug, Clone, PartialEq)]
pub enum BatchCalls {
    List(Vec<BatchCommand>),
    Map(Vec<(String, BatchCommand)>),
}

impl BatchCalls {
    /// Number of commands
    pub fn len(&self) -> usize {
        match self {
            Self::List(commands) => commands.len(),
            Self::Map(commands) => commands.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse the JSON form used on the command line:
    /// `[["method", {params}], ...]` or `{"key": ["method", {params}], ...}`.
    /// A bare `"method"` stands for a command without params.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(command_from_json)
                .collect::<Result<_>>()
                .map(Self::List),
            Value::Object(map) => map
                .into_iter()
                .map(|(key, item)| command_from_json(item).map(|c| (key, c)))
                .collect::<Result<_>>()
                .map(Self::Map),
            other => Err(Error::config(format!(
                "batch must be a list or a map of commands, got {other}"
            ))),
        }
    }

    /// The `cmd` parameter
    fn cmd(&self) -> JsonValue {
        match self {
            Self::List(commands) => Value::Array(
                commands
                    .iter()
                    .map(|c| Value::String(c.encode()))
                    .collect(),
            ),
            Self::Map(commands) => Value::Object(
                commands
                    .iter()
                    .map(|(key, c)| (key.clone(), Value::String(c.encode())))
                    .collect(),
            ),
        }
    }

    /// Originating calls, keyed the way the reply is
    fn into_queries(self) -> Shape<(String, Query)> {
        match self {
            Self::List(commands) => Shape::List(
                commands
                    .into_iter()
                    .enumerate()
                    .map(|(i, c)| (i.to_string(), c.into_query()))
                    .collect(),
            ),
            Self::Map(commands) => Shape::Map(
                commands
                    .into_iter()
                    .map(|(key, c)| (key.clone(), (key, c.into_query())))
                    .collect(),
            ),
        }
    }
}

fn command_from_json(value: JsonValue) -> Result<BatchCommand> {
    match value {
        Value::String(method) => Ok(BatchCommand::new(method, JsonObject::new())),
        Value::Array(mut parts) if (1..=2).contains(&parts.len()) => {
            let params = if parts.len() == 2 {
                match parts.pop() {
                    Some(Value::Object(params)) => params,
                    Some(Value::Null) | None => JsonObject::new(),
                    Some(other) => {
                        return Err(Error::config(format!(
                            "batch command params must be an object, got {other}"
                        )))
                    }
                }
            } else {
                JsonObject::new()
            };
            match parts.pop() {
                Some(Value::String(method)) => Ok(BatchCommand::new(method, params)),
                _ => Err(Error::config("batch command must start with a method name")),
            }
        }
        other => Err(Error::config(format!(
            "batch command must be \"method\" or [\"method\", {{params}}], got {other}"
        ))),
    }
}

/// Flatten params into a PHP-style query string
pub fn encode_params(params: &JsonObject) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten(key.clone(), value, &mut pairs);
    }
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn flatten(prefix: String, value: &JsonValue, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                flatten(format!("{prefix}[{key}]"), item, out);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(format!("{prefix}[{i}]"), item, out);
            }
        }
        Value::Null => out.push((prefix, String::new())),
        Value::Bool(flag) => out.push((prefix, if *flag { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((prefix, n.to_string())),
        Value::String(s) => out.push((prefix, s.clone())),
    }
}

/// Params of the `batch` call
pub(crate) fn batch_params(calls: &BatchCalls, halt_on_error: bool) -> Result<JsonObject> {
    if calls.len() > MAX_BATCH_COMMANDS {
        return Err(Error::BatchTooLarge {
            count: calls.len(),
            limit: MAX_BATCH_COMMANDS,
        });
    }

    let mut params = JsonObject::new();
    params.insert("halt".to_string(), json!(u8::from(halt_on_error)));
    params.insert("cmd".to_string(), calls.cmd());
    Ok(params)
}

/// Split a `batch` reply into one raw envelope per command.
///
/// A batch that failed as a whole gives every command the batch's error.
/// Commands skipped after a halt come back with neither result nor error.
pub(crate) fn unpack(body: JsonValue, calls: BatchCalls) -> Shape<RawResult> {
    let queries = calls.into_queries();

    let Some(slots) = body.get("result").filter(|r| r.is_object()) else {
        return queries.map(|(_, query)| RawResult::new(failed_batch(&body), Some(query)));
    };

    queries.map(|(key, query)| {
        let mut envelope = JsonObject::new();
        envelope.insert(
            "result".to_string(),
            slot(slots, "result", &key).cloned().unwrap_or(Value::Null),
        );
        if let Some(err) = slot(slots, "result_error", &key).filter(|e| !e.is_null()) {
            envelope.insert("error".to_string(), err.clone());
        }
        for (from, to) in [
            ("result_total", "total"),
            ("result_next", "next"),
            ("result_time", "time"),
        ] {
            if let Some(value) = slot(slots, from, &key).filter(|v| !v.is_null()) {
                envelope.insert(to.to_string(), value.clone());
            }
        }
        RawResult::new(Value::Object(envelope), Some(query))
    })
}

/// Envelope carrying a whole-batch failure
fn failed_batch(body: &JsonValue) -> JsonValue {
    if body.get("error").is_some_and(|e| !e.is_null()) {
        let mut envelope = body.clone();
        if let Value::Object(map) = &mut envelope {
            map.remove("result");
        }
        envelope
    } else {
        json!({
            "error": "INVALID_BATCH_RESPONSE",
            "error_description": "batch reply carries no result block"
        })
    }
}

/// Per-command slot; lists may come back as arrays or index-keyed objects
fn slot<'a>(slots: &'a JsonValue, field: &str, key: &str) -> Option<&'a JsonValue> {
    match slots.get(field)? {
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(key),
        _ => None,
    }
}
