use serde_json::{json, Value};

use crate::helpers::{spawn_app, spawn_app_with_jwt, SAVED_CONTENT};

fn save_body(app_doc_server: &str, status: i32, key: &str) -> Value {
    json!({
        "status": status,
        "key": key,
        "url": format!("{}/output/{}.docx", app_doc_server, key),
        "users": ["user1"],
        "history": {
            "serverVersion": "8.0.1",
            "created": "2024-03-01 10:15:30",
            "key": key,
            "changes": [
                {"created": "2024-03-01 10:15:30", "user": {"id": "user1", "name": "Test User"}}
            ]
        }
    })
}

#[tokio::test]
async fn save_downloads_document_and_records_history() {
    let app = spawn_app().await;

    let response = app
        .post_callback(&save_body(&app.document_server.address, 2, "k1"), None)
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"error": 0}));

    let saved = app.get_json("/saved").await;
    let saved = saved.as_array().expect("saved list");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["key"], "k1");
    let path = saved[0]["path"].as_str().expect("saved path");
    assert_eq!(std::fs::read(path).unwrap(), SAVED_CONTENT);

    let history = app.get_json("/api/history?filename=report.docx").await;
    assert_eq!(history["count"], 1);
    assert_eq!(history["versions"][0]["version"], "k1");
    assert_eq!(history["versions"][0]["created"], "2024-03-01T10:15:30");
    assert!(app
        .storage
        .path()
        .join(".history/k1/changes.json")
        .exists());
}

#[tokio::test]
async fn repeated_save_for_same_key_keeps_one_version() {
    let app = spawn_app().await;
    let body = save_body(&app.document_server.address, 6, "k1");

    assert_eq!(app.post_callback(&body, None).await.status(), 200);
    assert_eq!(app.post_callback(&body, None).await.status(), 200);

    let history = app.get_json("/api/history").await;
    assert_eq!(history["count"], 1);
    assert_eq!(history["versions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn statuses_without_side_effects_are_acknowledged() {
    let app = spawn_app().await;

    for status in [1, 3, 4, 5, 7, 42] {
        let response = app
            .post_callback(&json!({"status": status, "key": "k1"}), None)
            .await;

        assert_eq!(response.status(), 200, "status {status}");
        assert_eq!(response.json::<Value>().await.unwrap(), json!({"error": 0}));
    }

    assert_eq!(app.get_json("/saved").await, json!([]));
}

#[tokio::test]
async fn failed_download_is_an_internal_error() {
    let app = spawn_app().await;
    let body = json!({
        "status": 2,
        "key": "k1",
        "url": format!("{}/missing/k1.docx", app.document_server.address),
    });

    let response = app.post_callback(&body, None).await;

    assert_eq!(response.status(), 500);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"error": 1}));
    assert_eq!(app.get_json("/saved").await, json!([]));
}

#[tokio::test]
async fn save_without_url_is_an_internal_error() {
    let app = spawn_app().await;

    let response = app
        .post_callback(&json!({"status": 2, "key": "k1"}), None)
        .await;

    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn get_is_not_allowed() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .get(format!("{}/callback", app.address))
        .send()
        .await
        .expect("request sent");

    assert_eq!(response.status(), 405);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"error": 1}));
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(format!("{}/callback", app.address))
        .header("Content-Type", "application/json")
        .body("{\"status\":")
        .send()
        .await
        .expect("request sent");

    assert_eq!(response.status(), 400);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"error": 1}));
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = spawn_app_with_jwt(true).await;

    let response = app
        .post_callback(&save_body(&app.document_server.address, 2, "k1"), None)
        .await;

    assert_eq!(response.status(), 401);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"error": 1}));
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let app = spawn_app_with_jwt(true).await;

    let response = app
        .post_callback(
            &save_body(&app.document_server.address, 2, "k1"),
            Some("not-a-token"),
        )
        .await;

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn signed_claims_override_body() {
    let app = spawn_app_with_jwt(true).await;
    let token = app.signed_callback_token(2, "signed-key");
    let mut body = save_body(&app.document_server.address, 4, "body-key");
    body["url"] = json!(format!("{}/output/doc.docx", app.document_server.address));

    let response = app.post_callback(&body, Some(&token)).await;

    assert_eq!(response.status(), 200);
    let saved = app.get_json("/saved").await;
    assert_eq!(saved[0]["key"], "signed-key");
}
