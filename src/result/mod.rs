//! Result normalization module
//!
//! Every remote call produces a response envelope:
//!
//! ```text
//! { "result": ..., "next": 50, "total": 120, "time": {...} }
//! { "error": "ACCESS_DENIED", "error_description": "..." }
//! ```
//!
//! Batches produce a list or a keyed map of such envelopes. This module turns
//! all three layouts into `Shape<ApiResult>` and gives every result a
//! continuation for the next page.

mod normalizer;
mod shape;
mod types;

pub use normalizer::{Normalizer, ThrowMode};
pub use shape::Shape;
pub use types::{ApiError, ApiResult, Query, RawResult};

pub(crate) use types::as_u64;

/// Normalized result set
pub type ResultSet = Shape<ApiResult>;

#[cfg(test)]
mod tests;
