//! Wire types exchanged with the document server.

mod callback;
mod config;

pub use callback::{Action, Callback, CallbackStatus, Change, History, User};
pub use config::{
    Config, Customization, Document, DocumentKind, EditorConfig, EditorParams, MetaInfo,
    Permissions, ReferenceData, UserInfo,
};
