use std::{collections::HashMap, future::Future, sync::Arc};

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::{header, Method},
    routing::any,
    Json, Router,
};
use axum_extra::TypedHeader;
use futures::{future::BoxFuture, FutureExt};
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::TokenService,
    callback::authenticate,
    error::ApiError,
    models::{Callback, CallbackStatus},
};

/// Upper bound on callback bodies read into memory.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type Handler = Arc<dyn Fn(Callback) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Async handlers keyed by callback status. Statuses without a handler are
/// acknowledged and ignored.
#[derive(Clone, Default)]
pub struct CallbackHandlers {
    handlers: HashMap<CallbackStatus, Handler>,
}

impl CallbackHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F, Fut>(mut self, status: CallbackStatus, handler: F) -> Self
    where
        F: Fn(Callback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |callback: Callback| handler(callback).boxed());
        self.handlers.insert(status, handler);
        self
    }

    pub fn on_editing<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Callback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on(CallbackStatus::Editing, handler)
    }

    pub fn on_save<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Callback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on(CallbackStatus::Save, handler)
    }

    pub fn on_save_error<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Callback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on(CallbackStatus::SaveError, handler)
    }

    pub fn on_close<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Callback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on(CallbackStatus::Closed, handler)
    }

    pub fn on_force_save<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Callback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on(CallbackStatus::ForceSave, handler)
    }

    pub fn on_corrupted<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Callback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on(CallbackStatus::Corrupted, handler)
    }

    fn get(&self, status: CallbackStatus) -> Option<&Handler> {
        self.handlers.get(&status)
    }
}

/// Terminates callback requests from the document server.
pub struct CallbackReceiver {
    tokens: TokenService,
    handlers: CallbackHandlers,
}

impl CallbackReceiver {
    pub fn new(tokens: TokenService, handlers: CallbackHandlers) -> Self {
        Self { tokens, handlers }
    }

    /// A router answering on `/`; mount it with `Router::nest_service`.
    pub fn into_router(self) -> Router {
        Router::new()
            .route("/", any(receive_callback))
            .with_state(Arc::new(self))
    }

    pub async fn receive(&self, request: Request) -> Result<(), ApiError> {
        if request.method() != Method::POST {
            return Err(ApiError::MethodNotAllowed);
        }

        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .map(str::to_owned);

        let body = to_bytes(request.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| ApiError::BadRequest(format!("unreadable body: {e}")))?;

        let mut callback: Callback = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid callback body: {e}")))?;

        authenticate(&self.tokens, &mut callback, auth_header.as_deref())
            .map_err(|e| ApiError::AuthError(e.to_string()))?;

        self.dispatch(callback).await
    }

    pub async fn dispatch(&self, callback: Callback) -> Result<(), ApiError> {
        tracing::info!(key = %callback.key, status = callback.status, "received callback");

        let Some(status) = callback.status() else {
            tracing::debug!(status = callback.status, "unknown callback status");
            return Ok(());
        };
        let Some(handler) = self.handlers.get(status) else {
            tracing::debug!(status = status.code(), "no handler registered");
            return Ok(());
        };

        handler(callback).await.map_err(|error| {
            tracing::error!(%error, "callback handler returned an error");
            ApiError::UnexpectedError
        })
    }
}

async fn receive_callback(
    State(receiver): State<Arc<CallbackReceiver>>,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let user_agent = if let Some(TypedHeader(user_agent)) = user_agent {
        user_agent.to_string()
    } else {
        String::from("Unknown client")
    };
    let span = tracing::info_span!("Callback", request_id = %Uuid::new_v4(), %user_agent);

    receiver.receive(request).instrument(span).await?;
    Ok(Json(json!({ "error": 0 })))
}
