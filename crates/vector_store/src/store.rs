use anyhow::{Context, Result};
use pgvector::Vector;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Collection, Document, DocumentChunk, SearchResult};

const MAX_CONNECTIONS: u32 = 10;

/// Collections of chunk embeddings in PostgreSQL, searched with pgvector's
/// cosine distance operator.
pub struct VectorStore {
    pool: PgPool,
    embedding_dimensions: usize,
}

impl VectorStore {
    pub async fn new_with_dimensions(
        database_url: &str,
        embedding_dimensions: usize,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        db_migrations::run_migrations(database_url)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!(
            "Vector store ready (embedding dimensions: {})",
            embedding_dimensions
        );

        Ok(Self {
            pool,
            embedding_dimensions,
        })
    }

    pub fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    pub async fn find_collection(&self, name: &str) -> Result<Option<Collection>> {
        let row = sqlx::query("SELECT id, name, created_at FROM collections WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to look up collection {}", name))?;

        Ok(row.map(|row| Collection {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        }))
    }

    pub async fn get_or_create_collection(&self, name: &str) -> Result<Collection> {
        let candidate = Collection::new(name);
        let inserted = sqlx::query(
            r#"
            INSERT INTO collections (id, name, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.name)
        .bind(candidate.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to create collection {}", name))?
        .rows_affected();

        if inserted == 1 {
            tracing::info!("Created collection {}", name);
            return Ok(candidate);
        }

        self.find_collection(name)
            .await?
            .with_context(|| format!("Collection {} vanished after insert conflict", name))
    }

    /// Writes all chunks in one transaction. Nothing is stored if any chunk
    /// has the wrong embedding dimension.
    pub async fn insert_chunks(
        &self,
        collection_id: Uuid,
        chunks: Vec<DocumentChunk>,
    ) -> Result<usize> {
        for chunk in &chunks {
            self.check_dimensions(&chunk.embedding)?;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start insert transaction")?;

        let count = chunks.len();
        for chunk in chunks {
            let document = chunk.into_document(collection_id);
            let chunk_id = i32::try_from(document.chunk_id).with_context(|| {
                format!(
                    "Chunk id {} of {} does not fit the chunk_id column",
                    document.chunk_id, document.source
                )
            })?;
            sqlx::query(
                r#"
                INSERT INTO document_embeddings
                    (id, collection_id, source, chunk_id, content, embedding, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(document.id)
            .bind(document.collection_id)
            .bind(&document.source)
            .bind(chunk_id)
            .bind(&document.content)
            .bind(Vector::from(document.embedding))
            .bind(document.created_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert chunk from {}", document.source))?;
        }

        tx.commit()
            .await
            .context("Failed to commit inserted chunks")?;

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

        let rows = sqlx::query(
            r#"
            SELECT
                id,
                collection_id,
                source,
                chunk_id,
                content,
                embedding,
                created_at,
                1 - (embedding <=> $1) AS similarity
            FROM document_embeddings
            WHERE collection_id = $2
            ORDER BY embedding <=> $1
            LIMIT $3
            "#,
        )
        .bind(Vector::from(query_embedding))
        .bind(collection_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to execute similarity search")?;

        tracing::debug!(
            "Similarity search in {} returned {} rows",
            collection_id,
            rows.len()
        );

        Ok(rows
            .iter()
            .map(|row| {
                let similarity: f64 = row.get("similarity");
                SearchResult::new(document_from_row(row), similarity as f32)
            })
            .collect())
    }

    pub async fn list_sources(&self, collection_id: Uuid) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT source
            FROM document_embeddings
            WHERE collection_id = $1
            ORDER BY source
            "#,
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list document sources")?;

        Ok(rows.iter().map(|row| row.get("source")).collect())
    }

    /// Removes every chunk that came from `source` and returns how many rows went.
    pub async fn delete_source(&self, collection_id: Uuid, source: &str) -> Result<u64> {
        let removed = sqlx::query(
            "DELETE FROM document_embeddings WHERE collection_id = $1 AND source = $2",
        )
        .bind(collection_id)
        .bind(source)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to delete chunks from {}", source))?
        .rows_affected();

        tracing::info!(
            "Deleted {} chunks of {} from collection {}",
            removed,
            source,
            collection_id
        );
        Ok(removed)
    }

    /// Drops the named collection; its chunks go with it through the
    /// foreign key cascade. Returns whether a collection existed.
    pub async fn delete_collection(&self, name: &str) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM collections WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete collection {}", name))?
            .rows_affected();

        if removed > 0 {
            tracing::info!("Deleted collection {}", name);
        }
        Ok(removed > 0)
    }

    pub async fn get_document_count(&self, collection_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM document_embeddings WHERE collection_id = $1",
        )
        .bind(collection_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to get document count")?;

        Ok(row.get("count"))
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

fn document_from_row(row: &PgRow) -> Document {
    let embedding: Vector = row.get("embedding");
    Document {
        id: row.get("id"),
        collection_id: row.get("collection_id"),
        source: row.get("source"),
        chunk_id: row.get::<i32, _>("chunk_id") as usize,
        content: row.get("content"),
        embedding: embedding.into(),
        created_at: row.get("created_at"),
    }
}
