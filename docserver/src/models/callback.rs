use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_default_from_null;

/// Status codes the document server reports in a callback. Code 5 is never
/// sent and maps to no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackStatus {
    Editing,
    Save,
    SaveError,
    Closed,
    ForceSave,
    Corrupted,
}

impl CallbackStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Editing => 1,
            Self::Save => 2,
            Self::SaveError => 3,
            Self::Closed => 4,
            Self::ForceSave => 6,
            Self::Corrupted => 7,
        }
    }
}

impl TryFrom<i32> for CallbackStatus {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Editing),
            2 => Ok(Self::Save),
            3 => Ok(Self::SaveError),
            4 => Ok(Self::Closed),
            6 => Ok(Self::ForceSave),
            7 => Ok(Self::Corrupted),
            other => Err(other),
        }
    }
}

/// Body of a callback request sent by the document server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Callback {
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub actions: Vec<Action>,
    #[serde(rename = "changesurl", deserialize_with = "deserialize_default_from_null")]
    pub changes_url: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub history: History,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub key: String,
    pub status: i32,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub users: Vec<String>,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filename: String,
    #[serde(rename = "userAddress", skip_serializing_if = "String::is_empty")]
    pub user_address: String,
}

impl Callback {
    /// `None` for codes outside the known set.
    pub fn status(&self) -> Option<CallbackStatus> {
        CallbackStatus::try_from(self.status).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: i32,
    #[serde(rename = "userid")]
    pub user_id: String,
}

/// Change metadata attached to a save callback and persisted by the
/// history recorder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct History {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<Change>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub server_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "is_zero")]
    pub version: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Change {
    pub created: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}
