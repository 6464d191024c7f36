mod callback;
mod editor_config;
mod helpers;
