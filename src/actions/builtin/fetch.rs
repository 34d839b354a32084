//! fetch action - HTTP GET payload

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::actions::{Action, ActionError};
use crate::domain::ArgBag;

/// Fetch a URL; JSON bodies are parsed, anything else is returned as text
pub struct FetchAction {
    client: reqwest::Client,
}

impl FetchAction {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for FetchAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Action for FetchAction {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn description(&self) -> &'static str {
        "HTTP GET a URL. JSON responses are parsed, others returned as text."
    }

    async fn execute(&self, args: &[Value], kwargs: &ArgBag) -> Result<Value, ActionError> {
        let url = args
            .first()
            .or_else(|| kwargs.get("url"))
            .and_then(|v| v.as_str())
            .ok_or(ActionError::MissingArgument { name: "url" })?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ActionError::InvalidArgument(
                "url must start with http:// or https://".to_string(),
            ));
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ActionError::Failed(format!("HTTP error: {}", status)));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await?;

        if content_type.contains("application/json") {
            match serde_json::from_str::<Value>(&body) {
                Ok(parsed) => Ok(parsed),
                Err(_) => Ok(json!(body)),
            }
        } else {
            Ok(json!(body))
        }
    }
}
