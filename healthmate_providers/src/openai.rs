use std::time::Duration;

use async_trait::async_trait;
use healthmate_core::{ChatMessage, InferenceProvider, LLMResponse};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use crate::{build_client, normalize_reply, parse_usage};

/// Any endpoint speaking the `/chat/completions` dialect.
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        info!("Creating OpenAiCompatibleProvider: base_url={base_url}, model={model}");
        Ok(Self {
            client: build_client(timeout)?,
            api_key,
            model,
            base_url,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn parse_response(body: &Value) -> LLMResponse {
        // Bodies without a choice list go through the generic normalizer.
        let content = match &body["choices"][0]["message"]["content"] {
            Value::String(text) => text.clone(),
            _ => normalize_reply(body),
        };

        LLMResponse {
            content,
            usage: parse_usage(&body["usage"]),
        }
    }
}

#[async_trait]
impl InferenceProvider for OpenAiCompatibleProvider {
    async fn infer(&self, context: &[ChatMessage]) -> anyhow::Result<LLMResponse> {
        let request = json!({
            "model": self.model,
            "messages": context,
        });

        info!("Sending chat completion request: model={}", self.model);

        let body = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        info!("Received chat completion response");
        Ok(Self::parse_response(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url() {
        let provider = OpenAiCompatibleProvider::new(
            "key".to_string(),
            "https://open.bigmodel.cn/api/paas/v4/".to_string(),
            "glm-4-flash".to_string(),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://open.bigmodel.cn/api/paas/v4/chat/completions"
        );
        assert_eq!(provider.model(), "glm-4-flash");
    }

    #[test]
    fn reads_first_choice() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Sleep well." } }],
            "usage": { "prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8 }
        });
        let response = OpenAiCompatibleProvider::parse_response(&body);
        assert_eq!(response.content, "Sleep well.");
        assert_eq!(response.usage.map(|u| u.prompt_tokens), Some(5));
    }

    #[test]
    fn missing_choices_falls_back() {
        let body = json!({ "output_text": "fallback" });
        let response = OpenAiCompatibleProvider::parse_response(&body);
        assert_eq!(response.content, "fallback");
        assert!(response.usage.is_none());
    }
}
