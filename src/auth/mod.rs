//! Authentication module
//!
//! Supports: incoming webhooks (no token), fixed access tokens, and
//! application OAuth with refresh through the Bitrix24 OAuth server.
//!
//! The `Authenticator` caches the current `AuthState` and refreshes it when
//! it is about to expire.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, AuthState, DEFAULT_TOKEN_URL};
