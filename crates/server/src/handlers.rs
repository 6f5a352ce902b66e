use crate::app::AppState;
use crate::errors::ChatError;
use crate::models::{AskForm, FilesQuery, HealthResponse, RemoveFileForm};
use crate::session::session_id;
use crate::templates::{FileListTemplate, FilesTemplate, IndexTemplate, QaPairTemplate};
use askama::Template;
use axum::extract::{Multipart, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, Json};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use log::{info, warn};
use pdfchat_core::{collection_name_for, QaPair};

const UPLOAD_FIELD: &str = "pdf";
const HX_REQUEST: &str = "hx-request";

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ChatError> {
    let (session_id, jar) = session_id(jar);
    let session = state.sessions.load(&session_id).await?;
    let files = state
        .chat
        .list_files(session.collection_name.as_deref())
        .await?;

    let page = IndexTemplate {
        history: session.history,
        files,
    }
    .render()?;
    Ok((jar, Html(page)))
}

pub async fn upload(
    State(state): State<AppState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<(CookieJar, &'static str), ChatError> {
    let (session_id, jar) = session_id(jar);

    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ChatError::InvalidUpload(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        // An empty file input still submits a part with a blank file name.
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ChatError::InvalidUpload(e.to_string()))?;
        uploads.push((file_name, bytes.to_vec()));
    }

    if uploads.is_empty() {
        return Err(ChatError::NoFilesUploaded);
    }

    let mut chunks = Vec::new();
    for (file_name, bytes) in uploads {
        let file_chunks = state.chat.prepare_upload(&file_name, bytes).await?;
        if file_chunks.is_empty() {
            warn!("Skipping {}: no text extracted", file_name);
        }
        chunks.extend(file_chunks);
    }
    info!("Total chunks to index: {}", chunks.len());

    if chunks.is_empty() {
        return Err(ChatError::NoTextExtracted);
    }

    let session = state.sessions.load(&session_id).await?;
    let collection_name = session
        .collection_name
        .unwrap_or_else(|| collection_name_for(&session_id));

    if session.vectordb_initialized {
        info!("Adding documents to existing collection: {}", collection_name);
    } else {
        info!("Creating new vector collection: {}", collection_name);
    }
    state.chat.index_documents(&collection_name, chunks).await?;

    state
        .sessions
        .update(&session_id, |session| {
            session.collection_name.get_or_insert(collection_name);
            session.vectordb_initialized = true;
            session.last_accessed = Utc::now();
        })
        .await?;

    Ok((jar, "PDF uploaded and indexed successfully."))
}

pub async fn ask(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AskForm>,
) -> Result<(CookieJar, Html<String>), ChatError> {
    let (session_id, jar) = session_id(jar);

    let question = form.question.trim();
    if question.is_empty() {
        return Err(ChatError::EmptyQuestion);
    }

    let session = state.sessions.load(&session_id).await?;
    let collection_name = session.collection_name.ok_or(ChatError::NoDocuments)?;

    let answer = state
        .chat
        .ask(&collection_name, &session.history, question)
        .await?;

    let exchange = QaPair::new(question, answer.text.clone());
    state
        .sessions
        .update(&session_id, |session| {
            session.push_exchange(exchange, state.max_history)
        })
        .await?;

    let fragment = QaPairTemplate {
        question: question.to_string(),
        answer: answer.text,
        sources: answer.sources,
    }
    .render()?;
    Ok((jar, Html(fragment)))
}

pub async fn files(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<FilesQuery>,
) -> Result<(CookieJar, Html<String>), ChatError> {
    let (session_id, jar) = session_id(jar);
    let session = state.sessions.load(&session_id).await?;
    let files = state
        .chat
        .list_files(session.collection_name.as_deref())
        .await?;

    let html = if query.wants_partial() || headers.contains_key(HX_REQUEST) {
        FileListTemplate { files }.render()?
    } else {
        FilesTemplate { files }.render()?
    };
    Ok((jar, Html(html)))
}

pub async fn remove_file(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RemoveFileForm>,
) -> Result<(CookieJar, &'static str), ChatError> {
    let (session_id, jar) = session_id(jar);

    let file_name = form
        .file_name
        .filter(|name| !name.is_empty())
        .ok_or(ChatError::NoFileSpecified)?;

    let session = state.sessions.load(&session_id).await?;
    let collection_name = session.collection_name.ok_or(ChatError::NoCollection)?;

    state.chat.remove_file(&collection_name, &file_name).await?;
    info!("Removed {} from {}", file_name, collection_name);

    Ok((jar, "File removed successfully."))
}
