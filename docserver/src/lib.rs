pub mod auth;
pub mod callback;
pub mod client;
pub mod configuration;
pub mod conversion;
pub mod error;
pub mod history;
pub mod models;
pub mod receiver;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;

pub use auth::{KeyPolicy, TokenService};
pub use client::{Client, ClientConfig};
pub use error::{Error, Result};
pub use receiver::{CallbackHandlers, CallbackReceiver};
