use docserver::auth::ConfigClaims;
use serde_json::Value;

use crate::helpers::{spawn_app, spawn_app_with_jwt};

#[tokio::test]
async fn config_for_spreadsheet() {
    let app = spawn_app().await;

    let config = app
        .get_json("/api/config?filename=report.xlsx&user_id=user1&mode=edit&can_edit=true")
        .await;

    assert_eq!(config["documentType"], "spreadsheet");
    assert_eq!(config["document"]["fileType"], "xlsx");
    assert_eq!(config["document"]["title"], "report.xlsx");
    assert_eq!(config["document"]["permissions"]["edit"], true);
    assert_eq!(config["document"]["permissions"]["download"], false);
    assert_eq!(config["editorConfig"]["user"]["id"], "user1");
    assert_eq!(config["editorConfig"]["mode"], "edit");
    assert!(config["document"]["url"]
        .as_str()
        .unwrap()
        .ends_with("/files/report.xlsx"));
    assert!(config["editorConfig"]["callbackUrl"]
        .as_str()
        .unwrap()
        .ends_with("/callback"));
    assert!(config.get("token").is_none());
}

#[tokio::test]
async fn missing_filename_is_a_bad_request() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .get(format!("{}/api/config?user_id=user1", app.address))
        .send()
        .await
        .expect("request sent");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn config_is_signed_when_jwt_enabled() {
    let app = spawn_app_with_jwt(true).await;

    let config = app
        .get_json("/api/config?filename=notes.docx&user_id=user7")
        .await;
    let token = config["token"].as_str().expect("token attached");
    let claims: ConfigClaims = app.tokens.verify(token).unwrap().unwrap();

    assert_eq!(claims.document.key, config["document"]["key"].as_str().unwrap());
    assert_eq!(claims.document.file_type, "docx");
    assert_eq!(claims.editor_config.user.id, "user7");
    assert_eq!(
        Value::String(claims.document.url),
        config["document"]["url"]
    );
}
