use std::{path::PathBuf, time::Duration};

use config::ConfigError;
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::{auth::KeyPolicy, client::ClientConfig};

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub document_server: DocumentServerSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Address under which the document server reaches this application.
    pub base_url: String,
    pub storage_path: PathBuf,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DocumentServerSettings {
    pub url: String,
    pub jwt_enabled: bool,
    pub jwt_secret: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub key_policy: KeyPolicy,
}

impl DocumentServerSettings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            document_server_url: self.url.clone(),
            jwt_enabled: self.jwt_enabled,
            jwt_secret: self.jwt_secret.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
            key_policy: self.key_policy,
        }
    }
}

/// Layers `configuration/base`, `configuration/{environment}` and `APP_*`
/// environment variables (`APP_DOCUMENT_SERVER__JWT_ENABLED=true`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let mut settings = config::Config::default();
    let base_path =
        std::env::current_dir().map_err(|e| ConfigError::Foreign(Box::new(e)))?;
    let configuration_directory = base_path.join("configuration");

    settings.merge(config::File::from(configuration_directory.join("base")).required(true))?;

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    settings.merge(
        config::File::from(configuration_directory.join(environment.as_str())).required(true),
    )?;

    settings.merge(config::Environment::with_prefix("app").separator("__"))?;

    settings.try_into()
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
