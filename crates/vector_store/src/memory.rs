use anyhow::Result;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Collection, Document, DocumentChunk, SearchResult};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Collection>,
    documents: Vec<Document>,
}

/// Process-local stand-in for [`crate::VectorStore`], selected with a
/// `memory://` URL. Contents are lost on restart.
pub struct InMemoryVectorStore {
    inner: RwLock<Inner>,
    embedding_dimensions: usize,
}

impl InMemoryVectorStore {
    pub fn new(embedding_dimensions: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            embedding_dimensions,
        }
    }

    pub fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    pub async fn find_collection(&self, name: &str) -> Result<Option<Collection>> {
        Ok(self.inner.read().await.collections.get(name).cloned())
    }

    pub async fn get_or_create_collection(&self, name: &str) -> Result<Collection> {
        let mut inner = self.inner.write().await;
        let collection = inner
            .collections
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!("Created collection {}", name);
                Collection::new(name)
            })
            .clone();
        Ok(collection)
    }

    pub async fn insert_chunks(
        &self,
        collection_id: Uuid,
        chunks: Vec<DocumentChunk>,
    ) -> Result<usize> {
        for chunk in &chunks {
            self.check_dimensions(&chunk.embedding)?;
        }

        let count = chunks.len();
        let mut inner = self.inner.write().await;
        inner.documents.extend(
            chunks
                .into_iter()
                .map(|chunk| chunk.into_document(collection_id)),
        );
        tracing::info!("Inserted {} chunks into collection {}", count, collection_id);
        Ok(count)
    }

    pub async fn search_similar(
        &self,
        collection_id: Uuid,
        query_embedding: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.check_dimensions(&query_embedding)?;

        let inner = self.inner.read().await;
        let mut results: Vec<SearchResult> = inner
            .documents
            .iter()
            .filter(|doc| doc.collection_id == collection_id)
            .map(|doc| {
                let similarity = cosine_similarity(&query_embedding, &doc.embedding);
                SearchResult::new(doc.clone(), similarity)
            })
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(limit);
        Ok(results)
    }

    pub async fn list_sources(&self, collection_id: Uuid) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        let sources: BTreeSet<&str> = inner
            .documents
            .iter()
            .filter(|doc| doc.collection_id == collection_id)
            .map(|doc| doc.source.as_str())
            .collect();
        Ok(sources.into_iter().map(str::to_string).collect())
    }

    pub async fn delete_source(&self, collection_id: Uuid, source: &str) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.documents.len();
        inner
            .documents
            .retain(|doc| !(doc.collection_id == collection_id && doc.source == source));
        let removed = (before - inner.documents.len()) as u64;
        tracing::info!(
            "Deleted {} chunks of {} from collection {}",
            removed,
            source,
            collection_id
        );
        Ok(removed)
    }

    /// Drops the named collection together with its chunks.
    pub async fn delete_collection(&self, name: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(collection) = inner.collections.remove(name) else {
            return Ok(false);
        };
        inner.documents.retain(|doc| doc.collection_id != collection.id);
        tracing::info!("Deleted collection {}", name);
        Ok(true)
    }

    pub async fn get_document_count(&self, collection_id: Uuid) -> Result<i64> {
        let inner = self.inner.read().await;
        let count = inner
            .documents
            .iter()
            .filter(|doc| doc.collection_id == collection_id)
            .count();
        Ok(count as i64)
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.embedding_dimensions {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.embedding_dimensions,
                embedding.len()
            );
        }
        Ok(())
    }
}

/// Same measure as pgvector's `1 - (a <=> b)`. Zero vectors score 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
