use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use docserver::auth::CallbackClaims;
use docserver::configuration::get_configuration;
use docserver::startup::Application;
use docserver::telemetry::{get_subscriber, init_subscriber, DEFAULT_ENV_FILTER};
use docserver::TokenService;
use once_cell::sync::Lazy;
use secrecy::Secret;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const JWT_SECRET: &str = "test-secret";
pub const SAVED_CONTENT: &[u8] = b"edited document";

static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(DEFAULT_ENV_FILTER);
        init_subscriber(subscriber);
    }
});

/// Stand-in for the document server: conversion endpoint and file downloads.
pub struct FakeDocumentServer {
    pub address: String,
    pub conversions: Arc<Mutex<Vec<Value>>>,
}

impl FakeDocumentServer {
    pub async fn spawn() -> Self {
        let conversions = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route("/ConvertService.ashx", post(fake_convert))
            .route("/output/:name", get(|| async { SAVED_CONTENT }))
            .route(
                "/missing/:name",
                get(|| async { (StatusCode::NOT_FOUND, "gone") }),
            )
            .with_state(conversions.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("fake document server bound");
        let address: SocketAddr = listener.local_addr().expect("local address");
        tokio::spawn(async move { axum::serve(listener, router).await });

        Self {
            address: format!("http://{}", address),
            conversions,
        }
    }

    pub fn conversions(&self) -> Vec<Value> {
        self.conversions.lock().expect("conversions lock").clone()
    }
}

async fn fake_convert(
    State(conversions): State<Arc<Mutex<Vec<Value>>>>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    conversions
        .lock()
        .expect("conversions lock")
        .push(payload.clone());

    if payload["outputtype"] == "fail" {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!("conversion backend down")));
    }

    let error = if payload["filetype"] == "odp" { -3 } else { 0 };
    (
        StatusCode::OK,
        Json(json!({
            "fileUrl": format!("https://docs.example.com/converted.{}", payload["outputtype"].as_str().unwrap_or("")),
            "fileType": payload["outputtype"],
            "percent": 100,
            "endConvert": true,
            "error": error,
            "key": payload["key"],
        })),
    )
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub storage: TempDir,
    pub document_server: FakeDocumentServer,
    pub api_client: reqwest::Client,
    pub tokens: TokenService,
}

impl TestApp {
    pub async fn post_callback(&self, body: &Value, token: Option<&str>) -> reqwest::Response {
        let mut request = self
            .api_client
            .post(format!("{}/callback", self.address))
            .json(body);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request.send().await.expect("callback request sent")
    }

    pub fn signed_callback_token(&self, status: i32, key: &str) -> String {
        let claims = CallbackClaims {
            status: Some(status),
            key: Some(key.to_string()),
            payload: None,
        };
        self.tokens.sign(&claims).expect("token signed")
    }

    pub async fn get_json(&self, path: &str) -> Value {
        self.api_client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("request sent")
            .json()
            .await
            .expect("json body")
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_jwt(false).await
}

pub async fn spawn_app_with_jwt(jwt_enabled: bool) -> TestApp {
    // Only initialize tracer once instead of every test
    Lazy::force(&TRACING);

    let document_server = FakeDocumentServer::spawn().await;
    let storage = tempfile::tempdir().expect("storage dir created");

    let settings = {
        let mut c = get_configuration().expect("configuration fetched");
        c.application.port = 0;
        c.application.storage_path = storage.path().to_path_buf();
        c.document_server.url = document_server.address.clone();
        c.document_server.jwt_enabled = jwt_enabled;
        c.document_server.jwt_secret = Secret::new(JWT_SECRET.to_string());
        c
    };

    let application = Application::build(settings.clone())
        .await
        .expect("application built");
    let application_port = application.port();
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        port: application_port,
        storage,
        document_server,
        api_client: reqwest::Client::new(),
        tokens: TokenService::new(jwt_enabled, settings.document_server.jwt_secret),
    }
}
