pub mod chunker;
pub mod fallback;
pub mod openai;

pub use chunker::{ChunkConfig, TextChunk, TextChunker};
pub use fallback::FallbackEmbeddingProvider;
pub use openai::{OpenAiEmbeddingClient, OpenAiEmbeddingConfig};
pub use pdfchat_core::config::EmbeddingConfig;

use anyhow::{Context, Result};
use tracing::{info, warn};

pub type EmbedFuture<'a> =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>>;

pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, texts: Vec<String>) -> EmbedFuture<'_>;
    fn dimension(&self) -> usize;
}

impl EmbeddingProvider for OpenAiEmbeddingClient {
    fn embed(&self, texts: Vec<String>) -> EmbedFuture<'_> {
        Box::pin(self.embed(texts))
    }
    fn dimension(&self) -> usize {
        self.embedding_dimension()
    }
}

impl EmbeddingProvider for FallbackEmbeddingProvider {
    fn embed(&self, texts: Vec<String>) -> EmbedFuture<'_> {
        Box::pin(self.embed(texts))
    }
    fn dimension(&self) -> usize {
        self.embedding_dimension()
    }
}

pub fn create_embedding_provider(cfg: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match cfg.provider.as_str() {
        "openai" => {
            let defaults = OpenAiEmbeddingConfig::default();
            let api_key = std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set for the openai embedding provider")?;
            let base_url = cfg
                .base_url
                .clone()
                .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
                .unwrap_or(defaults.base_url.clone());
            let openai_cfg = OpenAiEmbeddingConfig {
                api_key,
                model: cfg.model.clone().unwrap_or(defaults.model.clone()),
                base_url,
                dimensions: cfg.dimensions.unwrap_or(defaults.dimensions),
                ..defaults
            };
            info!("Using OpenAI embeddings with model {}", openai_cfg.model);
            Ok(Box::new(OpenAiEmbeddingClient::new(openai_cfg)?))
        }
        "fallback" => Ok(Box::new(fallback_for(cfg))),
        other => {
            warn!("Unknown embedding provider '{}', using fallback embeddings", other);
            Ok(Box::new(fallback_for(cfg)))
        }
    }
}

fn fallback_for(cfg: &EmbeddingConfig) -> FallbackEmbeddingProvider {
    match cfg.dimensions {
        Some(dim) => FallbackEmbeddingProvider::new(dim),
        None => FallbackEmbeddingProvider::with_standard_dimension(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, dimensions: Option<usize>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: provider.to_string(),
            model: None,
            dimensions,
            base_url: None,
        }
    }

    #[test]
    fn should_create_fallback_provider_with_configured_dimension() {
        let provider = create_embedding_provider(&config("fallback", Some(256))).unwrap();
        assert_eq!(provider.dimension(), 256);
    }

    #[test]
    fn should_use_fallback_for_unknown_provider() {
        let provider = create_embedding_provider(&config("mystery", None)).unwrap();
        assert_eq!(provider.dimension(), 1536);
    }

    #[test]
    fn should_create_openai_provider_with_configured_dimension() {
        std::env::set_var("OPENAI_API_KEY", "test-key"); // pragma: allowlist secret
        let provider = create_embedding_provider(&config("openai", Some(3072))).unwrap();

        assert_eq!(provider.dimension(), 3072);
    }

    #[tokio::test]
    async fn should_embed_through_trait_object() {
        let provider = create_embedding_provider(&config("fallback", Some(16))).unwrap();
        let vectors = provider
            .embed(vec!["hello".to_string(), "world".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 16));
    }
}
