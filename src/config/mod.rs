//! Configuration Module
//!
//! Client configuration schema and loading.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    ClientConfig, BETA_BASE_URL, DEFAULT_BASE_URL, DEFAULT_CHAT_ENDPOINT,
    DEFAULT_COMPLETION_ENDPOINT, DEFAULT_TIMEOUT_SECS, MODELS_ENDPOINT, USER_BALANCE_ENDPOINT,
};
