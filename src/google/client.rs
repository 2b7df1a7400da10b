//! Authenticated HTTP client for the Google REST APIs. Every non-2xx
//! response becomes an `ErrandError::Upstream` carrying Google's own
//! error message.

use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::core::ErrandError;

pub struct GoogleClient {
    client: Client,
    access_token: String,
    base_url: String,
}

impl GoogleClient {
    pub fn new(access_token: &str, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let builder = self
            .client
            .get(self.url(path))
            .query(query)
            .bearer_auth(&self.access_token);
        self.execute(builder).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let builder = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.access_token)
            .json(body);
        self.execute(builder).await
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Value> {
        let response = builder
            .send()
            .await
            .map_err(|e| ErrandError::upstream(format!("HTTP request failed: {}", e)))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("Google API responded {}", status);

        if status.is_success() && body.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        if !status.is_success() {
            let message = error_message(&body, status);
            tracing::error!("Google API error: {}", message);
            return Err(ErrandError::Upstream(message).into());
        }

        let parsed = serde_json::from_str(&body).map_err(|e| {
            ErrandError::upstream(format!("Failed to parse response: {} (body: {})", e, body))
        })?;
        Ok(parsed)
    }
}

// Google errors look like {"error": {"code": 400, "message": "..."}}
fn error_message(body: &str, status: StatusCode) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v["error"]["message"].as_str())
        .map(str::to_string);
    match message {
        Some(message) => format!("Google API error {}: {}", status.as_u16(), message),
        None if status == StatusCode::TOO_MANY_REQUESTS => {
            "Rate limited by Google. Please try again later.".to_string()
        }
        None => format!("HTTP {} error", status),
    }
}
