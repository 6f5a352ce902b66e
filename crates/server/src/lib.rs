pub mod app;
pub mod chat;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod session;
pub mod templates;

pub use app::{create_app, AppState};
pub use chat::{Answer, ChatService};
pub use errors::ChatError;
