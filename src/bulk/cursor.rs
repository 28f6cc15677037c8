//! ID cursor scanning
//!
//! Offset paging gets slower the deeper it goes and skips or repeats rows
//! when the table changes underneath it. Scanning by `ID` instead asks for
//! `ID > last_seen_id` in ascending order with offsets disabled (`start=-1`)
//! until a page comes back empty.

use super::ensure_ok;
use crate::error::{Error, Result};
use crate::result::{as_u64, Normalizer, Query, RawResult};
use crate::transport::Transport;
use crate::types::{JsonObject, JsonValue};
use serde_json::{json, Value};
use tracing::debug;

/// Filter key carrying the exclusive lower bound
const ID_FLOOR: &str = ">ID";

/// Progress of one cursor scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorState {
    /// Highest `ID` seen so far (exclusive lower bound of the next page)
    pub last_seen_id: u64,
    /// Pages fetched, including the final empty one
    pub pages: u64,
    /// Records accumulated
    pub records: u64,
}

impl CursorState {
    pub fn new(last_seen_id: u64) -> Self {
        Self {
            last_seen_id,
            ..Default::default()
        }
    }

    /// Record a non-empty page ending at `last_id`
    pub fn advance(&mut self, last_id: u64, count: usize) {
        self.last_seen_id = last_id;
        self.pages += 1;
        self.records += count as u64;
    }
}

/// Lower-case the top-level keys of `params`.
///
/// Nested keys (`filter` entries, field names) are left alone.
pub fn lowercase_keys(params: JsonObject) -> JsonObject {
    params
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect()
}

/// Build the fixed part of a cursor scan's params.
///
/// Keys are lower-cased; `start` is forced to `-1`, `order` to ascending
/// `ID`, and `ID` is appended to an explicit `select` list unless it already
/// asks for `ID` or `*`. The caller's `filter` entries are kept; a `>ID` entry
/// in it becomes the starting watermark.
pub fn cursor_params(method: &str, params: JsonObject) -> Result<(JsonObject, CursorState)> {
    let mut params = lowercase_keys(params);

    let mut filter = match params.remove("filter") {
        None | Some(Value::Null) => JsonObject::new(),
        Some(Value::Object(filter)) => filter,
        Some(_) => return Err(Error::precondition(method, "filter must be an object")),
    };
    let start_id = filter.remove(ID_FLOOR).as_ref().and_then(as_u64).unwrap_or(0);
    params.insert("filter".to_string(), Value::Object(filter));

    params.insert("start".to_string(), json!(-1));
    params.insert("order".to_string(), json!({"ID": "ASC"}));

    if let Some(Value::Array(select)) = params.get_mut("select") {
        let has_id = select
            .iter()
            .any(|f| matches!(f.as_str(), Some("ID") | Some("*")));
        if !has_id {
            select.push(json!("ID"));
        }
    }

    Ok((params, CursorState::new(start_id)))
}

/// Params for the page after `last_seen_id`
fn page_params(base: &JsonObject, last_seen_id: u64) -> JsonObject {
    let mut params = base.clone();
    if let Some(Value::Object(filter)) = params.get_mut("filter") {
        filter.insert(ID_FLOOR.to_string(), json!(last_seen_id));
    }
    params
}

/// `ID` of a record, as a number or numeric string
fn record_id(record: &JsonValue) -> Option<u64> {
    record.get("ID").and_then(as_u64)
}

/// Fetch every record of `method` by scanning on `ID`.
///
/// Records must carry a unique `ID` that increases on insert; a page
/// containing a record without one fails with `Error::Precondition` instead
/// of looping forever.
pub async fn fetch_all_by_id_cursor<T>(
    transport: &T,
    normalizer: Normalizer,
    method: &str,
    params: JsonObject,
) -> Result<Vec<JsonValue>>
where
    T: Transport + ?Sized,
{
    let (base, mut state) = cursor_params(method, params)?;
    let mut accumulated = Vec::new();

    loop {
        let params = page_params(&base, state.last_seen_id);
        let body = transport.call(method, &params).await?;
        let page = normalizer.normalize_one(RawResult::new(body, Some(Query::new(method, params))))?;
        ensure_ok(&page)?;

        let records = page.records();
        let Some(last) = records.last() else {
            break;
        };

        let last_id = record_id(last)
            .ok_or_else(|| Error::precondition(method, "records carry no numeric ID field"))?;
        if last_id <= state.last_seen_id {
            return Err(Error::precondition(
                method,
                format!(
                    "ID did not advance past {} (got {last_id})",
                    state.last_seen_id
                ),
            ));
        }

        state.advance(last_id, records.len());
        accumulated.extend(records);

        debug!(
            "{method}: page {} ended at ID {}, {} records so far",
            state.pages, state.last_seen_id, state.records
        );
    }

    Ok(accumulated)
}
