use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub pgvector: PgVectorConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            max_upload_mb: 25,
        }
    }
}

impl ServerConfig {
    pub fn with_env_overrides(&self) -> Self {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| self.bind_addr.clone());
        Self {
            bind_addr,
            max_upload_mb: self.max_upload_mb,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: Option<String>,
    pub dimensions: Option<usize>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub primary: String,
    pub fallback: String,
    pub temperature: Option<f32>,
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn with_env_overrides(&self) -> Self {
        let primary = env::var("LLM_PRIMARY_MODEL").unwrap_or_else(|_| self.primary.clone());
        let fallback = env::var("LLM_FALLBACK_MODEL").unwrap_or_else(|_| self.fallback.clone());
        Self {
            primary,
            fallback,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PgVectorConfig {
    pub url: String,
}

impl PgVectorConfig {
    /// `PGVECTOR_URL` wins; otherwise any of the `DB_*` variables rebuilds the URL from parts.
    pub fn with_env_overrides(&self) -> Self {
        if let Ok(url) = env::var("PGVECTOR_URL") {
            return Self { url };
        }
        match Self::url_from_parts() {
            Some(url) => Self { url },
            None => self.clone(),
        }
    }

    fn url_from_parts() -> Option<String> {
        const PARTS: [&str; 5] = ["DB_NAME", "DB_USER", "DB_PASSWORD", "DB_HOST", "DB_PORT"];
        if !PARTS.iter().any(|name| env::var(name).is_ok()) {
            return None;
        }

        let part = |name: &str, default: &str| env::var(name).unwrap_or_else(|_| default.to_string());
        Some(format!(
            "postgresql://{}:{}@{}:{}/{}",
            part("DB_USER", "postgres"),
            part("DB_PASSWORD", "postgres"),
            part("DB_HOST", "localhost"),
            part("DB_PORT", "5432"),
            part("DB_NAME", "chatbot_db"),
        ))
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub url: String,
    pub ttl_seconds: u64,
    pub max_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "memory://".to_string(),
            // two weeks
            ttl_seconds: 1_209_600,
            max_history: 50,
        }
    }
}

impl SessionConfig {
    pub fn with_env_overrides(&self) -> Self {
        let url = env::var("SESSION_URL").unwrap_or_else(|_| self.url.clone());
        Self {
            url,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load_from_env() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| Self::default_config_path());
        Self::load(Path::new(&config_path))
    }

    pub fn default_config_path() -> String {
        "./config.toml".to_string()
    }

    /// Offline configuration: deterministic embeddings, in-memory vectors and sessions.
    pub fn development() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding: EmbeddingConfig {
                provider: "fallback".to_string(),
                model: None,
                dimensions: None,
                base_url: None,
            },
            llm: LlmConfig {
                primary: "gpt-3.5-turbo".to_string(),
                fallback: "gpt-4o-mini".to_string(),
                temperature: Some(0.0),
                base_url: None,
            },
            pgvector: PgVectorConfig {
                url: "memory://".to_string(),
            },
            session: SessionConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}
