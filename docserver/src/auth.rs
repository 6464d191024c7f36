use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_number_from_string;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Lifetime of tokens attached to editor configs.
pub const CONFIG_TOKEN_TTL_MINUTES: i64 = 5;

/// Signs and verifies the HMAC tokens exchanged with the document server.
#[derive(Clone)]
pub struct TokenService {
    enabled: bool,
    secret: Secret<String>,
}

impl TokenService {
    pub fn new(enabled: bool, secret: Secret<String>) -> Self {
        Self { enabled, secret }
    }

    pub fn disabled() -> Self {
        Self::new(false, Secret::new(String::new()))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns an empty token when token auth is off or no secret is set.
    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String> {
        if !self.enabled || self.secret.expose_secret().is_empty() {
            return Ok(String::new());
        }

        let token = encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )?;
        Ok(token)
    }

    /// Returns `Ok(None)` when token auth is off.
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<Option<C>> {
        if !self.enabled {
            return Ok(None);
        }

        let data = decode::<C>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &hmac_validation(),
        )
        .map_err(|e| {
            tracing::debug!(?e, "JWT decoding error");
            Error::Auth(e.to_string())
        })?;

        Ok(Some(data.claims))
    }
}

// Any HMAC variant is accepted; `exp` is checked only when present.
fn hmac_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.required_spec_claims = HashSet::new();
    validation.validate_aud = false;
    validation.leeway = 0;
    validation
}

/// Accepts both `Bearer <token>` and a bare token.
pub fn strip_bearer(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header)
}

pub fn config_token_expiry() -> i64 {
    (Utc::now() + chrono::Duration::minutes(CONFIG_TOKEN_TTL_MINUTES)).timestamp()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigClaims {
    pub document: DocumentClaims,
    pub editor_config: EditorConfigClaims,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentClaims {
    pub key: String,
    pub url: String,
    pub file_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfigClaims {
    pub user: UserClaims,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserClaims {
    pub id: String,
}

/// Claims of a callback token. The server puts `status` and `key` either at
/// the top level or under `payload`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackClaims {
    pub status: Option<i32>,
    pub key: Option<String>,
    pub payload: Option<CallbackPayloadClaims>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackPayloadClaims {
    pub status: Option<i32>,
    pub key: Option<String>,
}

impl CallbackClaims {
    pub fn status(&self) -> Option<i32> {
        self.status
            .or_else(|| self.payload.as_ref().and_then(|p| p.status))
    }

    pub fn key(&self) -> Option<&str> {
        self.key
            .as_deref()
            .or_else(|| self.payload.as_ref().and_then(|p| p.key.as_deref()))
    }
}

/// How document keys are derived from a filename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPolicy {
    /// Hash of filename and the current time; every call yields a new key.
    #[default]
    Timestamped,
    /// Hash of the filename alone.
    Deterministic,
}

pub fn generate_document_key(filename: &str, policy: KeyPolicy) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    if policy == KeyPolicy::Timestamped {
        hasher.update(Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
    }
    hex::encode(hasher.finalize())
}
