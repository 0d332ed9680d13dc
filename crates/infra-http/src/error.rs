// Foreign error mapping (orphan rule: no From impls for AppError here)

use yepcode_core::error::AppError;

/// Convert a reqwest failure into a transport error, keeping the status if any
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> AppError {
    let status = err.status().map(|s| s.as_u16());
    if err.is_timeout() {
        return AppError::transport(status, format!("Request timed out: {}", err));
    }
    if err.is_decode() {
        return AppError::Internal(format!("Malformed response body: {}", err));
    }
    AppError::transport(status, err.to_string())
}

pub(crate) fn map_config_error(err: ::config::ConfigError) -> AppError {
    AppError::Config(err.to_string())
}
