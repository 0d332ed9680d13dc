//! Team variables facade

use crate::context::SdkContext;
use std::sync::Arc;
use yepcode_core::application::EnvService;
use yepcode_core::domain::EnvVar;
use yepcode_core::port::TeamVariables;
use yepcode_core::Result;
use yepcode_infra_http::ApiConfig;

/// Read and write team variables by key
#[derive(Clone)]
pub struct YepCodeEnv {
    service: EnvService,
}

impl YepCodeEnv {
    pub fn new(config: ApiConfig) -> Result<Self> {
        Self::with_context(SdkContext::global(), config)
    }

    pub fn with_context(context: &SdkContext, config: ApiConfig) -> Result<Self> {
        let variables: Arc<dyn TeamVariables> = context.api(config)?;
        Ok(Self::from_variables(variables))
    }

    pub fn from_variables(variables: Arc<dyn TeamVariables>) -> Self {
        Self {
            service: EnvService::new(variables),
        }
    }

    pub async fn env_vars(&self) -> Result<Vec<EnvVar>> {
        self.service.env_vars().await
    }

    pub async fn set_env_var(&self, key: &str, value: &str, is_sensitive: bool) -> Result<()> {
        self.service.set_env_var(key, value, is_sensitive).await
    }

    /// Returns false when no variable had that key
    pub async fn del_env_var(&self, key: &str) -> Result<bool> {
        self.service.del_env_var(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yepcode_core::port::team_variables::mocks::InMemoryVariables;

    #[tokio::test]
    async fn test_set_list_delete() {
        let env = YepCodeEnv::from_variables(Arc::new(InMemoryVariables::new()));

        env.set_env_var("B", "2", false).await.unwrap();
        env.set_env_var("A", "1", true).await.unwrap();
        let keys: Vec<_> = env
            .env_vars()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.key)
            .collect();
        assert_eq!(keys, vec!["A", "B"]);

        assert!(env.del_env_var("A").await.unwrap());
        assert_eq!(env.env_vars().await.unwrap().len(), 1);
    }
}
