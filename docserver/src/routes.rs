use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::{
    callback::download_url,
    conversion::{can_convert, url_extension, ConvertOptions, ConvertResult},
    error::ApiError,
    history::{validate_key, HistoryVersion},
    models::{Callback, Config, EditorParams, History},
    receiver::{CallbackHandlers, HandlerError},
    startup::ApplicationState,
    store::SavedFile,
};

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Editor config for a file served from `/files`. The callback URL defaults
/// to this application's `/callback`.
pub async fn editor_config(
    State(state): State<Arc<ApplicationState>>,
    Query(mut params): Query<EditorParams>,
) -> Result<Json<Config>, ApiError> {
    if params.callback_url.is_empty() {
        params.callback_url = state.public_url("callback")?;
    }
    let file_url = state.public_url(&format!("files/{}", params.filename))?;

    let config = state.client.build_editor_config(&params, &file_url)?;
    Ok(Json(config))
}

pub async fn convert(
    State(state): State<Arc<ApplicationState>>,
    Json(mut opts): Json<ConvertOptions>,
) -> Result<Json<ConvertResult>, ApiError> {
    if opts.from_ext.is_empty() {
        opts.from_ext = url_extension(&opts.document_url);
    }
    if !can_convert(&opts.from_ext) {
        return Err(ApiError::BadRequest(format!(
            "cannot convert from '{}'",
            opts.from_ext
        )));
    }
    if opts.document_key.is_empty() {
        opts.document_key = state.client.generate_key(&opts.document_url);
    }

    let result = state.client.convert_document(&opts).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub versions: Vec<HistoryVersion>,
}

pub async fn history_versions(
    State(state): State<Arc<ApplicationState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let recorder = state.history.clone();
    let response = tokio::task::spawn_blocking(move || {
        recorder.list(&query.filename).map(|versions| HistoryResponse {
            count: recorder.count(),
            versions,
        })
    })
    .await
    .map_err(|e| {
        tracing::error!(?e, "history task failed");
        ApiError::UnexpectedError
    })??;

    Ok(Json(response))
}

pub async fn saved_files(State(state): State<Arc<ApplicationState>>) -> Json<Vec<SavedFile>> {
    Json(state.saved.list())
}

pub fn callback_handlers(state: Arc<ApplicationState>) -> CallbackHandlers {
    let force_save_state = state.clone();

    CallbackHandlers::new()
        .on_editing(log_editing)
        .on_save(move |callback| save_document(state.clone(), callback))
        .on_save_error(log_save_error)
        .on_close(log_closed)
        .on_force_save(move |callback| save_document(force_save_state.clone(), callback))
        .on_corrupted(log_corrupted)
}

async fn log_editing(callback: Callback) -> Result<(), HandlerError> {
    tracing::info!(key = %callback.key, users = ?callback.users, "document is being edited");
    Ok(())
}

async fn log_save_error(callback: Callback) -> Result<(), HandlerError> {
    tracing::warn!(key = %callback.key, "document server failed to save the document");
    Ok(())
}

async fn log_closed(callback: Callback) -> Result<(), HandlerError> {
    tracing::info!(key = %callback.key, "document closed without changes");
    Ok(())
}

async fn log_corrupted(callback: Callback) -> Result<(), HandlerError> {
    tracing::warn!(key = %callback.key, "document is corrupted");
    Ok(())
}

/// Downloads the edited document into `saved/`, records its history and
/// indexes it by key.
async fn save_document(
    state: Arc<ApplicationState>,
    callback: Callback,
) -> Result<(), HandlerError> {
    validate_key(&callback.key)?;
    let url = download_url(&callback)?;

    tracing::info!(key = %callback.key, %url, "downloading document");
    let content = state.client.download_file(url).await?;

    let ext = match url_extension(url) {
        ext if ext.is_empty() => "docx".to_string(),
        ext => ext,
    };
    let filename = format!(
        "{}-{}.{}",
        callback.key,
        Local::now().format("%Y%m%d-%H%M%S"),
        ext
    );
    let path = state.saved_dir().join(filename);
    tokio::fs::write(&path, &content).await?;
    tracing::info!(path = %path.display(), bytes = content.len(), "document saved");

    let key = callback.key.clone();
    if callback.history != History::default() {
        let recorder = state.history.clone();
        tokio::task::spawn_blocking(move || recorder.record(&callback)).await??;
    }

    state.saved.insert(key, path);
    Ok(())
}
