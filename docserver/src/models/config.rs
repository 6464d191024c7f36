use serde::{Deserialize, Serialize};

/// Editor widget configuration handed to the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(rename = "type")]
    pub kind: String,
    pub document: Document,
    pub document_type: DocumentKind,
    pub editor_config: EditorConfig,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Text,
    Spreadsheet,
    Presentation,
    Word,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "docx" | "doc" | "odt" | "rtf" | "txt" | "html" | "htm" | "mht" | "pdf" => Self::Text,
            "xlsx" | "xls" | "ods" | "csv" => Self::Spreadsheet,
            "pptx" | "ppt" | "odp" => Self::Presentation,
            _ => Self::Word,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
            Self::Word => "word",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub file_type: String,
    pub key: String,
    pub title: String,
    pub url: String,
    pub info: MetaInfo,
    pub permissions: Permissions,
    pub reference_data: ReferenceData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub owner: String,
    pub uploaded: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub chat: bool,
    pub download: bool,
    pub edit: bool,
    pub fill_forms: bool,
    pub print: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceData {
    pub file_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    pub user: UserInfo,
    pub callback_url: String,
    pub customization: Customization,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub lang: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customization {
    pub about: bool,
    pub feedback: bool,
}

/// Caller supplied options for an editing session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorParams {
    pub filename: String,
    pub mode: String,
    pub language: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub callback_url: String,
    pub can_edit: bool,
    pub can_download: bool,
}
