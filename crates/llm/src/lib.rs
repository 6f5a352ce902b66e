pub mod models;
pub mod openai;
pub mod prompts;

pub use models::{ChatMessage, ModelConfig};
pub use openai::OpenAiChatClient;

use anyhow::Result;
use async_trait::async_trait;

/// A hosted chat model that turns a message list into a single reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;
}
