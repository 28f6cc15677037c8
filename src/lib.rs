// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # bx24
//!
//! An asynchronous client for the Bitrix24 REST API.
//!
//! ## Features
//!
//! - **Uniform results**: single calls, list batches and keyed batches all come
//!   back as normalized `ApiResult`s with a `fetch_next` continuation
//! - **Throw-mode**: embedded platform errors become `Err` by default, or stay
//!   on the result for the caller to inspect
//! - **Bulk fetching**: ID cursor scanning and continuation walking over any
//!   list method
//! - **Auth**: incoming webhooks, fixed tokens, and OAuth with refresh
//! - **HTTP**: retry with backoff and client-side rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bx24::{Bx24Client, Bx24Config, JsonObject, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Bx24Config::new("https://example.bitrix24.ru/rest/1/0123456789abcdef/");
//!     let client = Bx24Client::from_config(&config)?;
//!
//!     let me = client.call_method("user.current", JsonObject::new()).await?;
//!     println!("{}", me.data());
//!
//!     let contacts = client
//!         .fetch_all_by_id_cursor("crm.contact.list", JsonObject::new())
//!         .await?;
//!     println!("{} contacts", contacts.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Bx24Client                           │
//! │  init()  call_method()  call_batch()  fetch_all_*()  pages() │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────────┬──────────────┴──────┬──────────────┬──────────┐
//! │    Bulk      │     Normalizer      │  Transport   │   Auth   │
//! ├──────────────┼─────────────────────┼──────────────┼──────────┤
//! │ ID cursor    │ Single/List/Map     │ HTTPS        │ Webhook  │
//! │ Continuation │ Throw-mode          │ In-memory    │ Token    │
//! │ Page stream  │ fetch_next          │ Retry, limit │ OAuth    │
//! └──────────────┴─────────────────────┴──────────────┴──────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication and token refresh
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Remote call transports
pub mod transport;

/// Result normalization
pub mod result;

/// Bulk fetchers
pub mod bulk;

/// Client configuration
pub mod config;

/// The Bitrix24 client
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use client::{BatchCalls, BatchCommand, Bx24Client};
pub use config::Bx24Config;
pub use result::{ApiError, ApiResult, Normalizer, ResultSet, Shape, ThrowMode};
pub use transport::{HttpTransport, InMemoryTransport, Transport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
