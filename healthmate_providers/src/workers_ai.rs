use std::time::Duration;

use async_trait::async_trait;
use healthmate_core::{ChatMessage, InferenceProvider, LLMResponse};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use crate::{build_client, normalize_reply, parse_usage};

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare Workers AI text generation over the REST API.
#[derive(Clone)]
pub struct WorkersAiProvider {
    client: Client,
    account_id: String,
    api_token: String,
    model: String,
    base_url: String,
}

impl WorkersAiProvider {
    pub fn new(
        account_id: String,
        api_token: String,
        model: String,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        info!("Creating WorkersAiProvider: model={model}");
        Ok(Self {
            client: build_client(timeout)?,
            account_id,
            api_token,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url.trim_end_matches('/'),
            self.account_id,
            self.model
        )
    }

    fn parse_response(body: &Value) -> anyhow::Result<LLMResponse> {
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            anyhow::bail!("Workers AI request failed: {}", body["errors"]);
        }

        Ok(LLMResponse {
            content: normalize_reply(body),
            usage: parse_usage(&body["result"]["usage"]),
        })
    }
}

#[async_trait]
impl InferenceProvider for WorkersAiProvider {
    async fn infer(&self, context: &[ChatMessage]) -> anyhow::Result<LLMResponse> {
        info!(
            "Sending request to Workers AI: model={}, messages={}",
            self.model,
            context.len()
        );

        let body = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_token)
            .json(&json!({ "messages": context }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        let response = Self::parse_response(&body)?;
        info!("Received response from Workers AI");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> WorkersAiProvider {
        WorkersAiProvider::new(
            "acct".to_string(),
            "token".to_string(),
            "@cf/meta/llama-3.3-70b-instruct-fp8-fast".to_string(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn endpoint_includes_account_and_model() {
        assert_eq!(
            provider().endpoint(),
            "https://api.cloudflare.com/client/v4/accounts/acct/ai/run/@cf/meta/llama-3.3-70b-instruct-fp8-fast"
        );
        let custom = provider().with_base_url("http://localhost:9000/".to_string());
        assert!(custom.endpoint().starts_with("http://localhost:9000/accounts/acct/"));
    }

    #[test]
    fn parses_rest_envelope() {
        let body = json!({
            "result": {
                "response": "Rest and hydration.",
                "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 }
            },
            "success": true,
            "errors": []
        });
        let response = WorkersAiProvider::parse_response(&body).unwrap();
        assert_eq!(response.content, "Rest and hydration.");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(16));
    }

    #[test]
    fn unsuccessful_envelope_is_an_error() {
        let body = json!({
            "result": null,
            "success": false,
            "errors": [{ "code": 3036, "message": "quota exceeded" }]
        });
        let err = WorkersAiProvider::parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
