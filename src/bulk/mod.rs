//! Bulk fetch module
//!
//! Supports: ID cursor scanning, continuation walking
//!
//! # Overview
//!
//! Both fetchers repeatedly call one paginated method until it is exhausted
//! and return every record in the order the portal emitted them. Paging is
//! strictly sequential: page N+1 is requested only after page N has been
//! appended.
//!
//! - `fetch_all_by_id_cursor` - drives paging with an exclusive `>ID` filter
//!   and ignores offsets, so it stays correct on very large tables
//! - `fetch_all_by_continuation` - follows the `next` offset of each page
//! - `pages` - the continuation walk as a `Stream` of normalized pages
//!
//! Unlike plain normalization, the fetchers always check each page for an
//! embedded error and fail with it, whatever the throw-mode.

mod continuation;
mod cursor;

pub use continuation::{fetch_all_by_continuation, pages};
pub use cursor::{cursor_params, fetch_all_by_id_cursor, lowercase_keys, CursorState};

use crate::error::{Error, Result};
use crate::result::ApiResult;

/// Fail with the page's embedded error, if any
fn ensure_ok(page: &ApiResult) -> Result<()> {
    match page.error() {
        Some(err) => Err(Error::from(err.clone())),
        None => Ok(()),
    }
}
