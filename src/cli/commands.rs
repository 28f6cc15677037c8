//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bitrix24 REST command-line client
#[derive(Parser, Debug)]
#[command(name = "bx24")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON); falls back to BX24_* environment variables
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// REST endpoint or incoming webhook URL, overrides the configuration
    #[arg(short, long, global = true)]
    pub webhook: Option<String>,

    /// Keep platform errors in the output instead of failing
    #[arg(long, global = true)]
    pub no_throw: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Call one REST method
    Call {
        /// Method name, e.g. crm.deal.get
        method: String,

        /// Params as a JSON object
        #[arg(short, long)]
        params: Option<String>,
    },

    /// Run several methods in one batch request
    Batch {
        /// Commands as JSON: [["method", {params}], ...] or {"key": ["method", {params}], ...}
        commands: String,

        /// Stop at the first failing command
        #[arg(long)]
        halt: bool,
    },

    /// Fetch every record of a list method
    FetchAll {
        /// List method name, e.g. crm.contact.list
        method: String,

        /// Params as a JSON object
        #[arg(short, long)]
        params: Option<String>,

        /// Paging strategy
        #[arg(short, long, default_value = "continuation")]
        strategy: FetchStrategy,

        /// Emit one message per page instead of one per record (continuation only)
        #[arg(long)]
        pages: bool,
    },

    /// Register an event handler
    Bind {
        /// Event name, e.g. OnCrmDealAdd
        event: String,

        /// Handler URL
        handler: String,

        /// User whose rights the handler runs with
        #[arg(long)]
        auth_type: Option<u64>,
    },

    /// Remove an event handler
    Unbind {
        /// Event name
        event: String,

        /// Handler URL
        handler: String,

        /// User the handler was registered for
        #[arg(long)]
        auth_type: Option<u64>,
    },

    /// Read or write an application or user option
    #[command(name = "option")]
    Opt {
        /// Option storage
        #[arg(long, default_value = "app")]
        scope: Scope,

        /// Option name
        name: String,

        /// Value to store; reads the option when omitted
        value: Option<String>,
    },

    /// Force an OAuth token refresh and print the new authorization
    RefreshAuth,

    /// Show the portal domain, authorization, and admin flag
    Info,
}

/// Bulk paging strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FetchStrategy {
    /// Scan by ID with a `>ID` filter
    Cursor,
    /// Follow the `next` offset
    Continuation,
}

/// Option storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scope {
    /// app.option.*
    App,
    /// user.option.*
    User,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
