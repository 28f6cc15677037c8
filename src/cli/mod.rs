//! CLI module
//!
//! Command-line interface for calling a Bitrix24 portal.
//!
//! # Commands
//!
//! - `call` - Call one REST method
//! - `batch` - Run several methods in one request
//! - `fetch-all` - Fetch every record of a list method
//! - `bind` / `unbind` - Manage event handlers
//! - `option` - Read or write application and user options
//! - `refresh-auth` - Force an OAuth token refresh
//! - `info` - Show portal and authorization details

mod commands;
mod runner;

pub use commands::{Cli, Commands, FetchStrategy, OutputFormat, Scope};
pub use runner::Runner;
