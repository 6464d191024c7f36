use std::{path::PathBuf, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::{
    client::Client,
    configuration::Settings,
    error::ApiError,
    history::HistoryRecorder,
    receiver::CallbackReceiver,
    routes::{callback_handlers, convert, editor_config, health_check, history_versions, saved_files},
    store::SavedFiles,
};

pub const SAVED_DIR: &str = "saved";

pub struct Application {
    listener: TcpListener,
    router: Router,
    port: u16,
}

pub struct ApplicationState {
    pub client: Client,
    pub history: HistoryRecorder,
    pub saved: SavedFiles,
    pub base_url: String,
    pub storage_path: PathBuf,
}

impl ApplicationState {
    pub fn saved_dir(&self) -> PathBuf {
        self.storage_path.join(SAVED_DIR)
    }

    /// Absolute URL of `path` under the configured base URL.
    pub fn public_url(&self, path: &str) -> Result<String, ApiError> {
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        url::Url::parse(&base)
            .and_then(|base| base.join(path))
            .map(String::from)
            .map_err(|error| {
                tracing::error!(%error, base_url = %self.base_url, "invalid public url");
                ApiError::UnexpectedError
            })
    }
}

impl Application {
    pub async fn build(settings: Settings) -> Result<Self, std::io::Error> {
        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );

        let listener = TcpListener::bind(address).await?;
        let port = listener.local_addr()?.port();

        let client = Client::new(settings.document_server.client_config())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        let storage_path = settings.application.storage_path;
        tokio::fs::create_dir_all(storage_path.join(SAVED_DIR)).await?;

        let application_state = Arc::new(ApplicationState {
            client: client.clone(),
            history: HistoryRecorder::new(storage_path.clone()),
            saved: SavedFiles::new(),
            base_url: settings.application.base_url,
            storage_path: storage_path.clone(),
        });

        let receiver = CallbackReceiver::new(
            client.tokens().clone(),
            callback_handlers(application_state.clone()),
        );

        let router = Router::new()
            .route("/health_check", get(health_check))
            .route("/api/config", get(editor_config))
            .route("/api/convert", post(convert))
            .route("/api/history", get(history_versions))
            .route("/saved", get(saved_files))
            .nest_service("/callback", receiver.into_router())
            .nest_service("/files", ServeDir::new(storage_path))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::default().include_headers(true)),
            )
            .with_state(application_state);

        Ok(Self {
            listener,
            router,
            port,
        })
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        if let Ok(address) = self.listener.local_addr() {
            tracing::info!("listening on {}", address);
        }
        axum::serve(self.listener, self.router).await
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
