// YepCode Infrastructure - HTTP Adapter
// Implements: RemoteService, TeamVariables (REST over reqwest)

mod api;
mod config;
mod error;
mod registry;

pub use api::YepCodeApi;
pub use config::{decode_api_token, ApiConfig, ResolvedConfig, DEFAULT_API_HOST, ENV_PREFIX};
pub use registry::ApiRegistry;

// Note: reqwest::Error and config::ConfigError conversion is handled by helper
// functions in `error` due to Rust's orphan rules
