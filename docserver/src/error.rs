use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the library operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authorization error: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("document server responded with status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown callback status {0}")]
    UnknownStatus(i32),

    #[error("document is corrupted")]
    CorruptedDocument,
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(e.to_string())
    }
}

/// Errors surfaced over HTTP. The detail is logged; the wire body is always
/// `{"error": 1}`, which is what the document server expects from a callback
/// endpoint.
#[derive(Debug)]
pub enum ApiError {
    MethodNotAllowed,
    BadRequest(String),
    AuthError(String),
    UnexpectedError,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            Self::UnexpectedError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::MethodNotAllowed => tracing::warn!("request rejected: method not allowed"),
            Self::BadRequest(e) => tracing::warn!(error = %e, "request rejected: bad request"),
            Self::AuthError(e) => tracing::warn!(error = %e, "request rejected: unauthorized"),
            Self::UnexpectedError => tracing::error!("request failed"),
        }

        (self.status_code(), Json(json!({ "error": 1 }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(_) | Error::UnknownStatus(_) | Error::CorruptedDocument => {
                Self::BadRequest(e.to_string())
            }
            Error::Auth(msg) => Self::AuthError(msg),
            other => {
                tracing::error!(error = %other, "unexpected error");
                Self::UnexpectedError
            }
        }
    }
}
