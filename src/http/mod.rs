//! HTTP layer for REST calls
//!
//! - **Retries**: 429, 5xx, timeouts and refused connections, with
//!   constant, linear or exponential backoff
//! - **Rate Limiting**: governor token bucket sized to the portal's limits

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
