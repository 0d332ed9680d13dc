//! Shared client cache

use once_cell::sync::Lazy;
use std::sync::Arc;
use yepcode_core::Result;
use yepcode_infra_http::{ApiConfig, ApiRegistry, YepCodeApi};

static GLOBAL: Lazy<SdkContext> = Lazy::new(SdkContext::new);

/// Owns the API client registry used by the facades
///
/// `YepCodeRun::new` and `YepCodeEnv::new` go through the process-wide
/// context; build a dedicated one when clients must not be shared.
#[derive(Debug, Default)]
pub struct SdkContext {
    registry: ApiRegistry,
}

impl SdkContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static SdkContext {
        &GLOBAL
    }

    pub fn registry(&self) -> &ApiRegistry {
        &self.registry
    }

    /// Client for the `YEPCODE_*` environment merged with `overrides`
    pub fn api(&self, overrides: ApiConfig) -> Result<Arc<YepCodeApi>> {
        self.api_for(&ApiConfig::from_env()?.merge(overrides))
    }

    /// Client for exactly `config`; the environment is not read
    pub fn api_for(&self, config: &ApiConfig) -> Result<Arc<YepCodeApi>> {
        self.registry.get_or_init(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explicit() -> ApiConfig {
        ApiConfig {
            access_token: Some("token".to_string()),
            team_id: Some("team".to_string()),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_same_config_shares_a_client() {
        let context = SdkContext::new();

        let a = context.api_for(&explicit()).unwrap();
        let b = context.api_for(&explicit()).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(context.registry().len(), 1);
    }

    #[test]
    fn test_contexts_do_not_share_clients() {
        let first = SdkContext::new();
        let second = SdkContext::new();

        let a = first.api_for(&explicit()).unwrap();
        let b = second.api_for(&explicit()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_distinct_configs_get_distinct_clients() {
        let context = SdkContext::new();
        let other = ApiConfig {
            team_id: Some("other-team".to_string()),
            ..explicit()
        };

        let a = context.api_for(&explicit()).unwrap();
        let b = context.api_for(&other).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(context.registry().len(), 2);
    }
}
