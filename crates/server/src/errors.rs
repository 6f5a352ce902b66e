use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("No files uploaded.")]
    NoFilesUploaded,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Error processing {file}: {message}")]
    Processing { file: String, message: String },

    #[error("No text could be extracted from the uploaded files.")]
    NoTextExtracted,

    #[error("Error indexing documents: {0}")]
    Indexing(String),

    #[error("Question cannot be empty.")]
    EmptyQuestion,

    #[error("No documents available. Please upload a PDF first.")]
    NoDocuments,

    #[error("Error retrieving documents: {0}")]
    Retrieval(String),

    #[error("Error generating answer: {0}")]
    Llm(String),

    #[error("No file specified.")]
    NoFileSpecified,

    #[error("No collection found.")]
    NoCollection,

    #[error("Collection not found.")]
    CollectionNotFound,

    #[error("Error removing file: {0}")]
    Removal(String),

    #[error("Error listing files: {0}")]
    Listing(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Error rendering page: {0}")]
    Template(String),
}

impl ChatError {
    pub fn http_status_code(&self) -> u16 {
        match self {
            ChatError::NoFilesUploaded => 400,
            ChatError::InvalidUpload(_) => 400,
            ChatError::Processing { .. } => 500,
            ChatError::NoTextExtracted => 422,
            ChatError::Indexing(_) => 500,
            ChatError::EmptyQuestion => 400,
            ChatError::NoDocuments => 400,
            ChatError::Retrieval(_) => 500,
            ChatError::Llm(_) => 503, // upstream model, can retry
            ChatError::NoFileSpecified => 400,
            ChatError::NoCollection => 400,
            ChatError::CollectionNotFound => 404,
            ChatError::Removal(_) => 500,
            ChatError::Listing(_) => 500,
            ChatError::Session(_) => 500,
            ChatError::Template(_) => 500,
        }
    }
}

impl From<askama::Error> for ChatError {
    fn from(e: askama::Error) -> Self {
        ChatError::Template(e.to_string())
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("{} ({})", self, status);
        } else {
            warn!("{} ({})", self, status);
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_correct_http_status_codes() {
        assert_eq!(ChatError::NoFilesUploaded.http_status_code(), 400);
        assert_eq!(ChatError::NoTextExtracted.http_status_code(), 422);
        assert_eq!(
            ChatError::Indexing("db down".to_string()).http_status_code(),
            500
        );
        assert_eq!(ChatError::EmptyQuestion.http_status_code(), 400);
        assert_eq!(ChatError::NoDocuments.http_status_code(), 400);
        assert_eq!(
            ChatError::Retrieval("timeout".to_string()).http_status_code(),
            500
        );
        assert_eq!(ChatError::Llm("rate limited".to_string()).http_status_code(), 503);
        assert_eq!(ChatError::NoFileSpecified.http_status_code(), 400);
        assert_eq!(ChatError::NoCollection.http_status_code(), 400);
        assert_eq!(ChatError::CollectionNotFound.http_status_code(), 404);
    }

    #[test]
    fn should_render_user_facing_messages() {
        let processing = ChatError::Processing {
            file: "scan.pdf".to_string(),
            message: "Failed to read PDF document".to_string(),
        };
        assert_eq!(
            processing.to_string(),
            "Error processing scan.pdf: Failed to read PDF document"
        );
        assert_eq!(
            ChatError::NoDocuments.to_string(),
            "No documents available. Please upload a PDF first."
        );
        assert_eq!(
            ChatError::Indexing("boom".to_string()).to_string(),
            "Error indexing documents: boom"
        );
    }

    #[tokio::test]
    async fn should_respond_with_plain_text_body() {
        let response = ChatError::CollectionNotFound.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Collection not found.");
    }
}
