use crate::errors::ChatError;
use anyhow::{Context, Result};
use documents::SourceChunk;
use embeddings::{create_embedding_provider, ChunkConfig, EmbeddingProvider, TextChunker};
use llm::prompts::{answer_messages, condense_question_messages};
use llm::{ChatModel, ModelConfig, OpenAiChatClient};
use log::{info, warn};
use pdfchat_core::config::Config;
use pdfchat_core::QaPair;
use std::sync::Arc;
use vector_store::{AnyVectorStore, DocumentChunk};

type EmbeddingClient = Box<dyn EmbeddingProvider>;

/// The model's reply together with the files its context came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
}

/// Indexing and conversational retrieval over per-session collections.
pub struct ChatService {
    vector_store: Arc<AnyVectorStore>,
    embeddings_client: EmbeddingClient,
    chat_model: Arc<dyn ChatModel>,
    text_chunker: TextChunker,
    top_k: usize,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("vector_store", &"AnyVectorStore<...>")
            .field("embeddings_client", &"EmbeddingProvider<...>")
            .field("chat_model", &"ChatModel<...>")
            .field("text_chunker", &self.text_chunker)
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl ChatService {
    pub async fn new(config: &Config) -> Result<Self> {
        let embeddings_client = create_embedding_provider(&config.embedding)
            .context("Failed to create embedding provider")?;

        let pg_cfg = config.pgvector.with_env_overrides();
        if pg_cfg.is_in_memory() {
            warn!("Vectors are kept in process memory and lost on restart");
        }
        let vector_store = AnyVectorStore::connect(&pg_cfg.url, embeddings_client.dimension())
            .await
            .context("Failed to initialize vector store")?;

        let llm_cfg = config.llm.with_env_overrides();
        let defaults = ModelConfig::default();
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
            warn!("OPENAI_API_KEY is not set; questions will fail until it is");
            String::new()
        });
        let model_config = ModelConfig {
            api_key,
            base_url: llm_cfg
                .base_url
                .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
                .unwrap_or(defaults.base_url.clone()),
            primary_model: llm_cfg.primary,
            fallback_model: llm_cfg.fallback,
            temperature: llm_cfg.temperature.unwrap_or(defaults.temperature),
            ..defaults
        };
        let chat_model =
            OpenAiChatClient::new(model_config).context("Failed to create chat client")?;

        let text_chunker = TextChunker::new(ChunkConfig {
            chunk_size: config.chunking.chunk_size,
            overlap_size: config.chunking.chunk_overlap,
        });

        Ok(Self::with_clients(
            Arc::new(vector_store),
            embeddings_client,
            Arc::new(chat_model),
            text_chunker,
            config.retrieval.top_k,
        ))
    }

    // Dependency-injection friendly constructor for tests
    pub fn with_clients(
        vector_store: Arc<AnyVectorStore>,
        embeddings_client: EmbeddingClient,
        chat_model: Arc<dyn ChatModel>,
        text_chunker: TextChunker,
        top_k: usize,
    ) -> Self {
        Self {
            vector_store,
            embeddings_client,
            chat_model,
            text_chunker,
            top_k,
        }
    }

    /// Extracts and chunks one uploaded PDF off the async runtime.
    pub async fn prepare_upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<SourceChunk>, ChatError> {
        let chunker = self.text_chunker.clone();
        let name = file_name.to_string();
        let processing_error = |message: String| ChatError::Processing {
            file: file_name.to_string(),
            message,
        };

        tokio::task::spawn_blocking(move || documents::process_pdf(&name, &bytes, &chunker))
            .await
            .map_err(|e| processing_error(e.to_string()))?
            .map_err(|e| processing_error(format!("{:#}", e)))
    }

    /// Embeds the chunks and adds them to the named collection, creating it
    /// on first use. Returns the number of chunks stored.
    pub async fn index_documents(
        &self,
        collection_name: &str,
        chunks: Vec<SourceChunk>,
    ) -> Result<usize, ChatError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self
            .embeddings_client
            .embed(texts)
            .await
            .map_err(|e| ChatError::Indexing(format!("{:#}", e)))?;

        let collection = self
            .vector_store
            .get_or_create_collection(collection_name)
            .await
            .map_err(|e| ChatError::Indexing(format!("{:#}", e)))?;

        let rows = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| {
                DocumentChunk::new(chunk.source, chunk.chunk_id, chunk.content, embedding)
            })
            .collect();

        let stored = self
            .vector_store
            .insert_chunks(collection.id, rows)
            .await
            .map_err(|e| ChatError::Indexing(format!("{:#}", e)))?;

        info!("Indexed {} chunks into {}", stored, collection_name);
        Ok(stored)
    }

    /// Answers `question` from the collection's content. With prior history the
    /// question is first rewritten into a standalone one, which then drives
    /// both retrieval and the answer.
    pub async fn ask(
        &self,
        collection_name: &str,
        history: &[QaPair],
        question: &str,
    ) -> Result<Answer, ChatError> {
        let standalone = if history.is_empty() {
            question.to_string()
        } else {
            let messages = condense_question_messages(
                history
                    .iter()
                    .map(|pair| (pair.question.as_str(), pair.answer.as_str())),
                question,
            );
            let condensed = self
                .chat_model
                .complete(messages)
                .await
                .map_err(|e| ChatError::Llm(format!("{:#}", e)))?;
            info!("Condensed follow-up question to: {}", condensed.trim());
            condensed.trim().to_string()
        };

        let query_embedding = self
            .embeddings_client
            .embed(vec![standalone.clone()])
            .await
            .map_err(|e| ChatError::Retrieval(format!("{:#}", e)))?
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Retrieval("No embedding generated".to_string()))?;

        let collection = self
            .vector_store
            .find_collection(collection_name)
            .await
            .map_err(|e| ChatError::Retrieval(format!("{:#}", e)))?;

        let results = match collection {
            Some(collection) => self
                .vector_store
                .search_similar(collection.id, query_embedding, self.top_k)
                .await
                .map_err(|e| ChatError::Retrieval(format!("{:#}", e)))?,
            None => {
                warn!("Collection {} does not exist, answering without context", collection_name);
                Vec::new()
            }
        };
        info!("Retrieved {} chunks for question", results.len());

        let mut sources: Vec<String> = Vec::new();
        for result in &results {
            if !sources.contains(&result.document.source) {
                sources.push(result.document.source.clone());
            }
        }

        let messages = answer_messages(
            results.iter().map(|r| r.document.content.as_str()),
            &standalone,
        );
        let text = self
            .chat_model
            .complete(messages)
            .await
            .map_err(|e| ChatError::Llm(format!("{:#}", e)))?;

        Ok(Answer { text, sources })
    }

    /// Distinct file names stored in the collection; empty when it does not exist.
    pub async fn list_files(&self, collection_name: Option<&str>) -> Result<Vec<String>, ChatError> {
        let Some(name) = collection_name else {
            return Ok(Vec::new());
        };

        let collection = self
            .vector_store
            .find_collection(name)
            .await
            .map_err(|e| ChatError::Listing(format!("{:#}", e)))?;

        match collection {
            Some(collection) => self
                .vector_store
                .list_sources(collection.id)
                .await
                .map_err(|e| ChatError::Listing(format!("{:#}", e))),
            None => Ok(Vec::new()),
        }
    }

    pub async fn remove_file(&self, collection_name: &str, file_name: &str) -> Result<u64, ChatError> {
        let collection = self
            .vector_store
            .find_collection(collection_name)
            .await
            .map_err(|e| ChatError::Removal(format!("{:#}", e)))?
            .ok_or(ChatError::CollectionNotFound)?;

        let removed = self
            .vector_store
            .delete_source(collection.id, file_name)
            .await
            .map_err(|e| ChatError::Removal(format!("{:#}", e)))?;

        if removed == 0 {
            warn!("No chunks of {} found in {}", file_name, collection_name);
        }
        Ok(removed)
    }

    /// Deletes a collection and everything indexed into it.
    pub async fn drop_collection(&self, collection_name: &str) -> Result<bool, ChatError> {
        self.vector_store
            .delete_collection(collection_name)
            .await
            .map_err(|e| ChatError::Removal(format!("{:#}", e)))
    }
}
