use reqwest::header;
use serde::{Deserialize, Serialize};

use crate::{
    client::Client,
    error::{Error, Result},
};

pub const CONVERT_PATH: &str = "ConvertService.ashx";

const CONVERTIBLE_EXTENSIONS: &[&str] = &[
    "doc", "docx", "odt", "rtf", "xls", "xlsx", "ods", "csv", "ppt", "pptx", "odp", "pdf", "txt",
    "html", "htm",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    pub document_url: String,
    /// Inferred from `document_url` when empty.
    pub from_ext: String,
    pub to_ext: String,
    pub document_key: String,
    pub is_async: bool,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertResult {
    #[serde(rename = "fileUrl")]
    pub file_url: String,
    #[serde(rename = "fileType")]
    pub file_type: String,
    pub percent: i32,
    #[serde(rename = "endConvert")]
    pub is_end: bool,
    /// Non-zero codes are reported by the server, not raised as errors.
    pub error: i32,
    pub key: String,
}

/// Request body for the conversion endpoint. Also the claim set of its
/// token, so it is signed before `token` is filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub url: String,
    #[serde(rename = "outputtype")]
    pub output_type: String,
    #[serde(rename = "filetype")]
    pub file_type: String,
    pub title: String,
    pub key: String,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub region: String,
    pub embedded: bool,
    pub can_download: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ConversionRequest {
    pub fn from_options(opts: &ConvertOptions) -> Self {
        let file_type = if opts.from_ext.is_empty() {
            url_extension(&opts.document_url)
        } else {
            opts.from_ext.clone()
        };

        Self {
            url: opts.document_url.clone(),
            output_type: opts.to_ext.clone(),
            file_type,
            title: opts.title.clone(),
            key: opts.document_key.clone(),
            is_async: opts.is_async,
            region: "en".to_string(),
            embedded: false,
            can_download: true,
            token: None,
        }
    }
}

impl Client {
    #[tracing::instrument(skip(self, opts), fields(url = %opts.document_url, to = %opts.to_ext))]
    pub async fn convert_document(&self, opts: &ConvertOptions) -> Result<ConvertResult> {
        let mut payload = ConversionRequest::from_options(opts);
        if self.tokens.is_enabled() {
            payload.token = Some(self.tokens.sign(&payload)?);
        }

        let convert_url = format!("{}/{}", self.base_url, CONVERT_PATH);
        let response = self
            .http
            .post(&convert_url)
            .header(header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != reqwest::StatusCode::OK {
            tracing::warn!(%status, "conversion request failed");
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let result: ConvertResult = serde_json::from_str(&body)?;
        if result.error != 0 {
            tracing::info!(code = result.error, "document server reported a conversion error");
        }
        Ok(result)
    }
}

pub fn can_convert(ext: &str) -> bool {
    CONVERTIBLE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// Maps legacy and open formats to the container format the editor works
/// with. Unknown extensions are returned unchanged.
pub fn internal_extension(ext: &str) -> String {
    match ext.to_lowercase().as_str() {
        "doc" | "odt" | "rtf" => "docx".to_string(),
        "xls" | "ods" | "csv" => "xlsx".to_string(),
        "ppt" | "odp" => "pptx".to_string(),
        _ => ext.to_string(),
    }
}

/// Extension of the last path segment; query and fragment are ignored.
pub fn url_extension(document_url: &str) -> String {
    let path = match url::Url::parse(document_url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => document_url.to_string(),
    };
    let segment = path.rsplit('/').next().unwrap_or_default();

    segment
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default()
}
