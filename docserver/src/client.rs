use std::time::Duration;

use chrono::Local;
use secrecy::Secret;

use crate::{
    auth::{
        config_token_expiry, generate_document_key, ConfigClaims, DocumentClaims,
        EditorConfigClaims, KeyPolicy, TokenService, UserClaims,
    },
    error::{Error, Result},
    models::{
        Config, Customization, Document, DocumentKind, EditorConfig, EditorParams, MetaInfo,
        Permissions, ReferenceData, UserInfo,
    },
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Format used for `uploaded` dates and history timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone)]
pub struct ClientConfig {
    pub document_server_url: String,
    pub jwt_enabled: bool,
    pub jwt_secret: Secret<String>,
    pub timeout: Duration,
    pub key_policy: KeyPolicy,
}

impl ClientConfig {
    pub fn new(document_server_url: impl Into<String>) -> Self {
        Self {
            document_server_url: document_server_url.into(),
            jwt_enabled: false,
            jwt_secret: Secret::new(String::new()),
            timeout: DEFAULT_TIMEOUT,
            key_policy: KeyPolicy::default(),
        }
    }

    pub fn with_jwt(mut self, secret: Secret<String>) -> Self {
        self.jwt_enabled = true;
        self.jwt_secret = secret;
        self
    }
}

/// Entry point for talking to the document server.
#[derive(Clone)]
pub struct Client {
    pub(crate) base_url: String,
    pub(crate) http: reqwest::Client,
    pub(crate) tokens: TokenService,
    key_policy: KeyPolicy,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Self {
        Self {
            base_url: config.document_server_url.trim_end_matches('/').to_string(),
            http,
            tokens: TokenService::new(config.jwt_enabled, config.jwt_secret),
            key_policy: config.key_policy,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn generate_key(&self, filename: &str) -> String {
        generate_document_key(filename, self.key_policy)
    }

    #[tracing::instrument(skip(self, params), fields(filename = %params.filename))]
    pub fn build_editor_config(&self, params: &EditorParams, file_url: &str) -> Result<Config> {
        if params.filename.is_empty() {
            return Err(Error::Validation("filename is required".to_string()));
        }

        let ext = file_extension(&params.filename);
        let key = self.generate_key(&params.filename);

        let mut config = Config {
            kind: "desktop".to_string(),
            document_type: DocumentKind::from_extension(&ext),
            document: Document {
                file_type: ext.clone(),
                key: key.clone(),
                title: params.filename.clone(),
                url: file_url.to_string(),
                info: MetaInfo {
                    owner: params.user_id.clone(),
                    uploaded: Local::now().format(TIMESTAMP_FORMAT).to_string(),
                },
                permissions: Permissions {
                    chat: true,
                    download: params.can_download,
                    edit: params.can_edit,
                    fill_forms: true,
                    print: true,
                },
                reference_data: ReferenceData {
                    file_key: key.clone(),
                },
            },
            editor_config: EditorConfig {
                user: UserInfo {
                    id: params.user_id.clone(),
                    name: params.user_name.clone(),
                    email: params.user_email.clone(),
                },
                callback_url: params.callback_url.clone(),
                customization: Customization {
                    about: true,
                    feedback: true,
                },
                lang: params.language.clone(),
                mode: params.mode.clone(),
            },
            token: String::new(),
        };

        if self.tokens.is_enabled() {
            let claims = ConfigClaims {
                document: DocumentClaims {
                    key,
                    url: file_url.to_string(),
                    file_type: ext,
                },
                editor_config: EditorConfigClaims {
                    user: UserClaims {
                        id: params.user_id.clone(),
                    },
                },
                exp: config_token_expiry(),
            };
            config.token = self.tokens.sign(&claims)?;
        }

        tracing::debug!(
            key = %config.document.key,
            document_type = config.document_type.as_str(),
            "built editor config"
        );
        Ok(config)
    }

    /// Fetches a document, typically the `url` of a save callback.
    pub async fn download_file(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Lower-cased text after the last `.`, empty when there is none.
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}
