//! Application and user option storage

use super::Bx24Client;
use crate::error::Result;
use crate::result::ApiResult;
use crate::types::{JsonObject, JsonValue};
use serde_json::json;

/// Where options are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope {
    /// Shared by every user of the application (`app.option.*`)
    App,
    /// Private to the current user (`user.option.*`)
    User,
}

impl OptionScope {
    fn prefix(self) -> &'static str {
        match self {
            Self::App => "app.option",
            Self::User => "user.option",
        }
    }
}

/// Option accessor bound to a client
#[derive(Debug, Clone, Copy)]
pub struct Options<'a> {
    client: &'a Bx24Client,
    scope: OptionScope,
}

impl<'a> Options<'a> {
    pub(crate) fn new(client: &'a Bx24Client, scope: OptionScope) -> Self {
        Self { client, scope }
    }

    pub fn scope(&self) -> OptionScope {
        self.scope
    }

    /// Store `value` under `name`
    pub async fn set(&self, name: &str, value: impl Into<JsonValue>) -> Result<ApiResult> {
        let mut options = JsonObject::new();
        options.insert(name.to_string(), value.into());

        let mut params = JsonObject::new();
        params.insert("options".to_string(), JsonValue::Object(options));
        self.client
            .call_method(&format!("{}.set", self.scope.prefix()), params)
            .await
    }

    /// Read the value stored under `name`
    pub async fn get(&self, name: &str) -> Result<ApiResult> {
        let params = json!({ "option": name });
        let params = params.as_object().cloned().unwrap_or_default();
        self.client
            .call_method(&format!("{}.get", self.scope.prefix()), params)
            .await
    }
}
