use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "text-embedding-ada-002".to_string(),
            base_url: "https://api.openai.com".to_string(),
            dimensions: 1536,
            batch_size: 1000,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbeddingClient {
    config: OpenAiEmbeddingConfig,
    client: Client,
}

impl OpenAiEmbeddingClient {
    pub fn new(config: OpenAiEmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    pub fn embedding_dimension(&self) -> usize {
        self.config.dimensions
    }

    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            debug!("Embedding batch of {} texts", batch.len());
            embeddings.extend(self.embed_batch(batch).await?);
        }

        Ok(embeddings)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.try_embed(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    warn!("Embedding request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        let delay = Duration::from_millis(1000 * (2_u64.pow(attempt)));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Embedding request was never attempted")))
    }

    async fn try_embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            input: texts,
            model: &self.config.model,
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to embeddings API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Embeddings API returned error {}: {}",
                status,
                error_text
            ));
        }

        let mut embed_response: EmbedResponse = response
            .json()
            .await
            .context("Failed to parse embeddings API response")?;

        if embed_response.data.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Embeddings API returned {} vectors for {} inputs",
                embed_response.data.len(),
                texts.len()
            ));
        }

        embed_response.data.sort_by_key(|item| item.index);
        Ok(embed_response
            .data
            .into_iter()
            .map(|item| item.embedding)
            .collect())
    }
}
