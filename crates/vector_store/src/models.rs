use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named group of embeddings. Each browser session owns at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// A stored chunk row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub source: String,
    pub chunk_id: usize,
    pub content: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// A chunk with its embedding, ready to be written into a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub source: String,
    pub chunk_id: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl DocumentChunk {
    pub fn new(
        source: impl Into<String>,
        chunk_id: usize,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            source: source.into(),
            chunk_id,
            content: content.into(),
            embedding,
        }
    }

    pub fn into_document(self, collection_id: Uuid) -> Document {
        Document {
            id: Uuid::new_v4(),
            collection_id,
            source: self.source,
            chunk_id: self.chunk_id,
            content: self.content,
            embedding: self.embedding,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub similarity: f32,
}

impl SearchResult {
    pub fn new(document: Document, similarity: f32) -> Self {
        Self {
            document,
            similarity,
        }
    }
}
