use crate::{
    auth::{strip_bearer, CallbackClaims, TokenService},
    error::{Error, Result},
    models::{Callback, CallbackStatus},
};

/// Parses a callback body and, when token auth is enabled, authenticates
/// it. Verified claims override the body's `status` and `key`.
pub fn parse_callback(
    tokens: &TokenService,
    body: &[u8],
    auth_header: Option<&str>,
) -> Result<Callback> {
    let mut callback: Callback = serde_json::from_slice(body)?;
    authenticate(tokens, &mut callback, auth_header)?;
    Ok(callback)
}

pub(crate) fn authenticate(
    tokens: &TokenService,
    callback: &mut Callback,
    auth_header: Option<&str>,
) -> Result<()> {
    if !tokens.is_enabled() {
        return Ok(());
    }

    let header = auth_header
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::Auth("auth header is missing".to_string()))?;
    let token = strip_bearer(header);

    if let Some(claims) = tokens.verify::<CallbackClaims>(token)? {
        if let Some(status) = claims.status() {
            callback.status = status;
        }
        if let Some(key) = claims.key() {
            callback.key = key.to_string();
        }
    }
    callback.token = token.to_string();

    Ok(())
}

/// Accepts only callbacks that carry a document ready to be stored.
pub fn validate_callback(status: i32) -> Result<()> {
    match CallbackStatus::try_from(status) {
        Ok(CallbackStatus::Save | CallbackStatus::ForceSave) => Ok(()),
        Ok(CallbackStatus::Corrupted) => Err(Error::CorruptedDocument),
        _ => Err(Error::UnknownStatus(status)),
    }
}

pub fn download_url(callback: &Callback) -> Result<&str> {
    if callback.url.is_empty() {
        return Err(Error::Validation("empty download url".to_string()));
    }
    Ok(&callback.url)
}
