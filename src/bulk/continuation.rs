//! Continuation walking

use super::ensure_ok;
use crate::error::Result;
use crate::result::{ApiResult, Normalizer, Query, RawResult};
use crate::transport::Transport;
use crate::types::{JsonObject, JsonValue};
use futures::stream::{self, Stream, TryStreamExt};
use tracing::debug;

/// Walk state: the call that yields the next page
enum Walk {
    Call(Query),
    Done,
}

/// Stream every page of `method`, normalized, in order.
///
/// The first item is the reply to `method(params)`; each later one is the
/// reply to the continuation of the page before it, one call per page. The
/// stream ends after the page that reports no more data, or with the first
/// error.
pub fn pages<'a, T>(
    transport: &'a T,
    normalizer: Normalizer,
    method: &'a str,
    params: JsonObject,
) -> impl Stream<Item = Result<ApiResult>> + 'a
where
    T: Transport + ?Sized + 'a,
{
    stream::try_unfold(Walk::Call(Query::new(method, params)), move |walk| async move {
        let Walk::Call(query) = walk else {
            return Ok(None);
        };

        debug!("{}: fetching page at offset {:?}", query.method, query.params.get("start"));
        let body = transport.call(&query.method, &query.params).await?;
        let page = normalizer.normalize_one(RawResult::new(body, Some(query)))?;
        ensure_ok(&page)?;

        let next = page.continuation().map_or(Walk::Done, Walk::Call);
        Ok(Some((page, next)))
    })
}

/// Fetch every record of `method` by following page continuations
pub async fn fetch_all_by_continuation<T>(
    transport: &T,
    normalizer: Normalizer,
    method: &str,
    params: JsonObject,
) -> Result<Vec<JsonValue>>
where
    T: Transport + ?Sized,
{
    let mut pages = std::pin::pin!(pages(transport, normalizer, method, params));
    let mut accumulated = Vec::new();

    while let Some(page) = pages.try_next().await? {
        accumulated.extend(page.records());
        debug!(
            "{method}: {} of {:?} records fetched",
            accumulated.len(),
            page.total()
        );
    }

    Ok(accumulated)
}
