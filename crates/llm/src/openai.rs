use crate::models::{ChatMessage, CompletionRequest, CompletionResponse, ModelConfig};
use crate::ChatModel;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Client;
use std::time::Duration;

pub struct OpenAiChatClient {
    client: Client,
    config: ModelConfig,
}

impl OpenAiChatClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        info!(
            "Initializing chat client with model {} (fallback {})",
            config.primary_model, config.fallback_model
        );
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The first attempt uses the primary model, every retry the fallback model.
    pub async fn call_chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.config.max_retries {
            let model = if attempt == 0 {
                &self.config.primary_model
            } else {
                &self.config.fallback_model
            };

            match self.try_call_chat(messages, model).await {
                Ok(answer) => return Ok(answer),
                Err(e) => {
                    warn!("Chat completion with {} failed: {}", model, e);
                    last_error = Some(e);
                    attempt += 1;

                    if attempt <= self.config.max_retries {
                        let delay = Duration::from_millis(1000 * (2_u64.pow(attempt - 1)));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Chat completion was never attempted")))
    }

    async fn try_call_chat(&self, messages: &[ChatMessage], model: &str) -> Result<String> {
        let request = CompletionRequest {
            model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        info!("Sending chat completion request to model: {}", model);
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completion send error: {:?}", e);
                anyhow::anyhow!("Failed to send request to chat completion API: {}", e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Chat completion API returned error {}: {}",
                status,
                error_text
            ));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        if let Some(usage) = &completion.usage {
            info!(
                "Model {} used {} prompt and {} completion tokens",
                model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Chat completion response contained no choices"))
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        self.call_chat(&messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn config_for(server: &MockServer) -> ModelConfig {
        ModelConfig {
            api_key: "test-key".to_string(), // pragma: allowlist secret
            base_url: server.base_url(),
            max_retries: 0,
            ..ModelConfig::default()
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [
                { "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
            ]
        })
    }

    #[test]
    fn should_create_chat_client() {
        let client = OpenAiChatClient::new(ModelConfig::default()).unwrap();
        assert_eq!(client.config().primary_model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn should_return_first_choice_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .json_body(json!({
                        "model": "gpt-3.5-turbo",
                        "messages": [ { "role": "user", "content": "Hello" } ],
                        "temperature": 0.0
                    }));
                then.status(200).json_body(completion("Hi there"));
            })
            .await;

        let client = OpenAiChatClient::new(config_for(&server)).unwrap();
        let answer = client
            .complete(vec![ChatMessage::user("Hello".to_string())])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "Hi there");
    }

    #[tokio::test]
    async fn should_use_fallback_model_on_retry() {
        let server = MockServer::start_async().await;
        let primary = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .json_body_partial(r#"{ "model": "gpt-3.5-turbo" }"#);
                then.status(503).body("unavailable");
            })
            .await;
        let fallback = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .json_body_partial(r#"{ "model": "gpt-4o-mini" }"#);
                then.status(200).json_body(completion("from fallback"));
            })
            .await;

        let config = ModelConfig {
            max_retries: 1,
            ..config_for(&server)
        };
        let client = OpenAiChatClient::new(config).unwrap();
        let answer = client
            .complete(vec![ChatMessage::user("Hello".to_string())])
            .await
            .unwrap();

        primary.assert_async().await;
        fallback.assert_async().await;
        assert_eq!(answer, "from fallback");
    }

    #[tokio::test]
    async fn should_fail_when_api_returns_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let client = OpenAiChatClient::new(config_for(&server)).unwrap();
        let error = client
            .complete(vec![ChatMessage::user("Hello".to_string())])
            .await
            .unwrap_err();

        assert!(error.to_string().contains("429"));
    }

    #[tokio::test]
    async fn should_fail_when_no_choices_returned() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let client = OpenAiChatClient::new(config_for(&server)).unwrap();
        let result = client
            .complete(vec![ChatMessage::user("Hello".to_string())])
            .await;

        assert!(result.is_err());
    }
}
