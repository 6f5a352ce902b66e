pub mod memory;
pub mod models;
pub mod session_store;
pub mod store;

pub use memory::InMemoryVectorStore;
pub use models::{Collection, Document, DocumentChunk, SearchResult};
pub use session_store::RedisSessionStore;
pub use store::VectorStore;

use anyhow::Result;
use uuid::Uuid;

pub const MEMORY_URL: &str = "memory://";

/// Either backend behind one set of methods.
pub enum AnyVectorStore {
    Postgres(VectorStore),
    InMemory(InMemoryVectorStore),
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            AnyVectorStore::Postgres($store) => $call,
            AnyVectorStore::InMemory($store) => $call,
        }
    };
}

impl AnyVectorStore {
    /// `memory://` selects the in-memory backend; anything else is treated as
    /// a PostgreSQL URL.
    pub async fn connect(url: &str, embedding_dimensions: usize) -> Result<Self> {
        if url.starts_with(MEMORY_URL) {
            tracing::info!("Using in-memory vector store");
            return Ok(Self::InMemory(InMemoryVectorStore::new(
                embedding_dimensions,
            )));
        }
        let store = VectorStore::new_with_dimensions(url, embedding_dimensions).await?;
        Ok(Self::Postgres(store))
    }

    pub fn embedding_dimensions(&self) -> usize {
        dispatch!(self, s => s.embedding_dimensions())
    }

    pub async fn find_collection(&self, name: &str) -> Result<Option<Collection>> {
        dispatch!(self, s => s.find_collection(name).await)
    }

    pub async fn get_or_create_collection(&self, name: &str) -> Result<Collection> {
        dispatch!(self, s => s.get_or_create_collection(name).await)
    }

    pub async fn insert_chunks(
        &self,
        collection_id: Uuid,
        chunks: Vec<DocumentChunk>,
    ) -> Result<usize> {
        dispatch!(self, s => s.insert_chunks(collection_id, chunks).await)
    }

    pub async fn search_similar(
        &self,
        collection_id: Uuid,
        query_embedding: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        dispatch!(self, s => s.search_similar(collection_id, query_embedding, limit).await)
    }

    pub async fn list_sources(&self, collection_id: Uuid) -> Result<Vec<String>> {
        dispatch!(self, s => s.list_sources(collection_id).await)
    }

    pub async fn delete_source(&self, collection_id: Uuid, source: &str) -> Result<u64> {
        dispatch!(self, s => s.delete_source(collection_id, source).await)
    }

    pub async fn delete_collection(&self, name: &str) -> Result<bool> {
        dispatch!(self, s => s.delete_collection(name).await)
    }

    pub async fn get_document_count(&self, collection_id: Uuid) -> Result<i64> {
        dispatch!(self, s => s.get_document_count(collection_id).await)
    }
}
