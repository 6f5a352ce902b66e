use anyhow::Result;

/// Fallback embeddings provider used for offline development and tests.
///
/// Each lowercase alphanumeric token is hashed into one slot of the vector and the
/// result is L2-normalised, so texts sharing words land close together under
/// cosine similarity. Text without any token maps to the first unit vector, so
/// every embedding has a defined cosine distance.
pub struct FallbackEmbeddingProvider {
    embedding_dim: usize,
}

impl FallbackEmbeddingProvider {
    pub fn new(embedding_dim: usize) -> Self {
        Self {
            embedding_dim: embedding_dim.max(1),
        }
    }

    pub fn with_standard_dimension() -> Self {
        Self::new(1536)
    }

    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embedding_dim
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.embedding_dim];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let slot = (fnv1a(&token.to_lowercase()) % self.embedding_dim as u64) as usize;
            embedding[slot] += 1.0;
        }

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            embedding[0] = 1.0;
            return embedding;
        }
        for value in &mut embedding {
            *value /= norm;
        }

        embedding
    }
}

fn fnv1a(token: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    token
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn should_create_fallback_provider_with_custom_dimension() {
        let provider = FallbackEmbeddingProvider::new(512);
        assert_eq!(provider.embedding_dimension(), 512);
    }

    #[test]
    fn should_create_fallback_provider_with_standard_dimension() {
        let provider = FallbackEmbeddingProvider::with_standard_dimension();
        assert_eq!(provider.embedding_dimension(), 1536);
    }

    #[tokio::test]
    async fn should_return_empty_embeddings_for_empty_input() {
        let provider = FallbackEmbeddingProvider::new(64);
        let result = provider.embed(vec![]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn should_return_normalised_vectors_of_requested_dimension() {
        let provider = FallbackEmbeddingProvider::new(64);
        let result = provider
            .embed(vec!["vacation policy".to_string()])
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].len(), 64);
        let norm = result[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn should_be_deterministic() {
        let provider = FallbackEmbeddingProvider::new(64);
        let texts = vec!["same text".to_string()];

        let first = provider.embed(texts.clone()).await.unwrap();
        let second = provider.embed(texts).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn should_ignore_case_and_punctuation() {
        let provider = FallbackEmbeddingProvider::new(64);
        let result = provider
            .embed(vec!["Remote work!".to_string(), "remote, WORK".to_string()])
            .await
            .unwrap();

        assert_eq!(result[0], result[1]);
    }

    #[tokio::test]
    async fn should_rank_shared_vocabulary_higher() {
        let provider = FallbackEmbeddingProvider::new(1024);
        let result = provider
            .embed(vec![
                "employees may work remotely three days".to_string(),
                "how many days can employees work remotely".to_string(),
                "the cafeteria serves lunch at noon".to_string(),
            ])
            .await
            .unwrap();

        assert!(cosine(&result[0], &result[1]) > cosine(&result[2], &result[1]));
    }

    #[tokio::test]
    async fn should_map_text_without_tokens_to_unit_vector() {
        let provider = FallbackEmbeddingProvider::new(8);
        let result = provider
            .embed(vec!["  ...  ".to_string(), String::new()])
            .await
            .unwrap();

        let expected = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(result[0], expected);
        assert_eq!(result[1], expected);
        let norm = result[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }
}
