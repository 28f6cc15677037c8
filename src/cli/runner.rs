//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, FetchStrategy, OutputFormat, Scope};
use crate::client::{BatchCalls, Bx24Client, Options};
use crate::config::Bx24Config;
use crate::error::{Error, Result};
use crate::result::{ApiResult, ResultSet, Shape};
use crate::types::{params_object, JsonObject};
use futures::TryStreamExt;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let client = Bx24Client::from_config(&self.load_config()?)?;

        match &self.cli.command {
            Commands::Call { method, params } => {
                let params = parse_params(params.as_deref())?;
                let result = client.call_method(method, params).await?;
                self.output_message(&result_message(&result));
            }
            Commands::Batch { commands, halt } => {
                let calls = parse_batch(commands)?;
                let results = client.call_batch(calls, *halt).await?;
                self.output_message(&batch_message(&results));
            }
            Commands::FetchAll {
                method,
                params,
                strategy,
                pages,
            } => {
                let params = parse_params(params.as_deref())?;
                self.fetch_all(&client, method, params, *strategy, *pages)
                    .await?;
            }
            Commands::Bind {
                event,
                handler,
                auth_type,
            } => {
                let result = client.call_bind(event, handler, *auth_type).await?;
                self.output_message(&result_message(&result));
            }
            Commands::Unbind {
                event,
                handler,
                auth_type,
            } => {
                let result = client.call_unbind(event, handler, *auth_type).await?;
                self.output_message(&result_message(&result));
            }
            Commands::Opt { scope, name, value } => {
                let options = match scope {
                    Scope::App => client.app_option(),
                    Scope::User => client.user_option(),
                };
                self.option(options, name, value.as_deref()).await?;
            }
            Commands::RefreshAuth => {
                let state = client.refresh_auth().await?;
                self.output_message(&json!({"type": "AUTH", "auth": state}));
            }
            Commands::Info => {
                let is_admin = client.is_admin().await?;
                self.output_message(&json!({
                    "type": "INFO",
                    "info": {
                        "domain": client.get_domain().await,
                        "is_admin": is_admin,
                        "expires_at": client.get_auth().await.and_then(|a| a.expires_at),
                    }
                }));
            }
        }

        Ok(())
    }

    /// Load configuration from the file or the environment, then apply flags
    fn load_config(&self) -> Result<Bx24Config> {
        let mut config = match (&self.cli.config, &self.cli.webhook) {
            (Some(path), _) => Bx24Config::from_file(path)?.with_env_overrides(),
            (None, Some(webhook)) => Bx24Config::new(webhook.clone()).with_env_overrides(),
            (None, None) => Bx24Config::from_env()?,
        };

        if let Some(webhook) = &self.cli.webhook {
            config.endpoint.clone_from(webhook);
        }
        if self.cli.no_throw {
            config.throw_errors = false;
        }

        config.validate()?;
        Ok(config)
    }

    /// Fetch every record and emit one message per record or per page
    async fn fetch_all(
        &self,
        client: &Bx24Client,
        method: &str,
        params: JsonObject,
        strategy: FetchStrategy,
        per_page: bool,
    ) -> Result<()> {
        let start = Instant::now();

        let count = match (strategy, per_page) {
            (FetchStrategy::Continuation, true) => {
                let mut pages = std::pin::pin!(client.pages(method, params).await?);
                let mut count = 0;
                while let Some(page) = pages.try_next().await? {
                    count += page.records().len();
                    self.output_message(&result_message(&page));
                }
                count
            }
            (FetchStrategy::Cursor, true) => {
                return Err(Error::config("--pages is only supported with --strategy continuation"));
            }
            (strategy, false) => {
                let records = match strategy {
                    FetchStrategy::Cursor => client.fetch_all_by_id_cursor(method, params).await?,
                    FetchStrategy::Continuation => {
                        client.fetch_all_by_continuation(method, params).await?
                    }
                };
                for record in &records {
                    self.output_message(&json!({
                        "type": "RECORD",
                        "record": {"method": method, "data": record}
                    }));
                }
                records.len()
            }
        };

        info!(
            "Fetched {count} records from {method} in {:.2}s",
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Read an option, or write it when a value is given
    async fn option(&self, options: Options<'_>, name: &str, value: Option<&str>) -> Result<()> {
        let result = match value {
            // Values that parse as JSON are stored as such, anything else as a string
            Some(raw) => {
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
                options.set(name, value).await?
            }
            None => options.get(name).await?,
        };
        self.output_message(&result_message(&result));
        Ok(())
    }

    /// Output a message to stdout
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Parse `--params` JSON into an object
fn parse_params(raw: Option<&str>) -> Result<JsonObject> {
    let Some(raw) = raw else {
        return Ok(JsonObject::new());
    };
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Error::config(format!("Invalid params JSON: {e}")))?;
    params_object(value).ok_or_else(|| Error::config("params must be a JSON object"))
}

fn parse_batch(raw: &str) -> Result<BatchCalls> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Error::config(format!("Invalid batch JSON: {e}")))?;
    BatchCalls::from_json(value)
}

fn result_json(result: &ApiResult) -> Value {
    json!({
        "data": result.data(),
        "error": result.error().map(|e| json!({
            "code": e.code,
            "description": e.description,
            "status": e.status,
        })),
        "total": result.total(),
        "next": result.next_start(),
        "time": result.time(),
    })
}

fn result_message(result: &ApiResult) -> Value {
    json!({"type": "RESULT", "result": result_json(result)})
}

fn batch_message(results: &ResultSet) -> Value {
    let results = match results {
        Shape::Single(result) => result_json(result),
        Shape::List(items) => Value::Array(items.iter().map(result_json).collect()),
        Shape::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, result)| (key.clone(), result_json(result)))
                .collect(),
        ),
    };
    json!({"type": "BATCH", "results": results})
}
