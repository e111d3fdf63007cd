//! Upstream completions API client.
//!
//! The agent webhook does not run model inference itself; it forwards the
//! chat payload to the configured completions API and passes the response
//! through to the caller, metering token usage along the way.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::CompletionsConfig;

/// Errors that can occur when talking to the completions API.
#[derive(Debug, Error)]
pub enum CompletionsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the client or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Completions API reply, with token accounting.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// Raw response body forwarded to the caller, `usage` block included.
    pub body: serde_json::Value,
    /// Total tokens consumed by the request, when reported.
    pub usage: Option<CompletionUsage>,
}

/// Token usage block of a completions response.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CompletionUsage {
    /// Total tokens consumed.
    pub total_tokens: i64,
}

/// Client for the external completions API.
#[derive(Clone)]
pub struct CompletionsClient {
    client: reqwest::Client,
    api_url: String,
}

impl CompletionsClient {
    /// Create a new completions client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &CompletionsConfig) -> Result<Self, CompletionsError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| CompletionsError::Parse(format!("Invalid API key format: {e}")))?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// Forward a chat payload to the completions API.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API responds with a
    /// non-success status.
    pub async fn complete(
        &self,
        payload: &serde_json::Value,
    ) -> Result<CompletionOutcome, CompletionsError> {
        let response = self.client.post(&self.api_url).json(payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionsError::Parse(e.to_string()))?;

        Ok(outcome_from_body(body))
    }
}

/// Read the token accounting out of a completions response without
/// removing it from the body handed back to the caller.
fn outcome_from_body(body: serde_json::Value) -> CompletionOutcome {
    let usage = body
        .get("usage")
        .and_then(|u| serde_json::from_value::<CompletionUsage>(u.clone()).ok());

    CompletionOutcome { body, usage }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn forwarded_body_keeps_the_usage_block() {
        let outcome = outcome_from_body(json!({
            "id": "cmpl-1",
            "choices": [{"message": {"content": "hi"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        }));

        assert_eq!(outcome.usage.unwrap().total_tokens, 5);
        assert_eq!(outcome.body["usage"]["total_tokens"], json!(5));
    }

    #[test]
    fn missing_usage_block_yields_none() {
        let outcome = outcome_from_body(json!({"id": "cmpl-1", "choices": []}));
        assert!(outcome.usage.is_none());
    }

    #[test]
    fn malformed_usage_block_is_ignored_but_forwarded() {
        let outcome = outcome_from_body(json!({"id": "cmpl-1", "usage": "n/a"}));
        assert!(outcome.usage.is_none());
        assert_eq!(outcome.body["usage"], json!("n/a"));
    }
}
