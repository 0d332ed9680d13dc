// Env Service - team variables as key/value pairs

use crate::application::pagination::collect_pages;
use crate::domain::{
    CreateVariableInput, EnvVar, TeamVariable, UpdateVariableInput, DEFAULT_PAGE_LIMIT,
};
use crate::error::Result;
use crate::port::TeamVariables;
use std::sync::Arc;
use tracing::{debug, info};

/// Key-addressed access to team variables
///
/// The platform addresses variables by id; this service looks them up by
/// key so callers never deal with ids.
#[derive(Clone)]
pub struct EnvService {
    variables: Arc<dyn TeamVariables>,
}

impl EnvService {
    pub fn new(variables: Arc<dyn TeamVariables>) -> Self {
        Self { variables }
    }

    /// All team variables, sorted by key
    pub async fn env_vars(&self) -> Result<Vec<EnvVar>> {
        Ok(self
            .all_variables()
            .await?
            .into_iter()
            .map(EnvVar::from)
            .collect())
    }

    /// Update the variable named `key`, or create it
    ///
    /// `is_sensitive` only applies on creation; an update keeps the
    /// existing flag.
    pub async fn set_env_var(&self, key: &str, value: &str, is_sensitive: bool) -> Result<()> {
        match self.find(key).await? {
            Some(existing) => {
                self.variables
                    .update_variable(
                        &existing.id,
                        UpdateVariableInput {
                            key: key.to_string(),
                            value: value.to_string(),
                        },
                    )
                    .await?;
                info!(key = %key, "Variable updated");
            }
            None => {
                self.variables
                    .create_variable(CreateVariableInput {
                        key: key.to_string(),
                        value: value.to_string(),
                        is_sensitive,
                    })
                    .await?;
                info!(key = %key, is_sensitive = %is_sensitive, "Variable created");
            }
        }
        Ok(())
    }

    /// Delete the variable named `key`; returns false when there was none
    pub async fn del_env_var(&self, key: &str) -> Result<bool> {
        let Some(existing) = self.find(key).await? else {
            debug!(key = %key, "Variable not present, nothing to delete");
            return Ok(false);
        };
        self.variables.delete_variable(&existing.id).await?;
        info!(key = %key, "Variable deleted");
        Ok(true)
    }

    async fn find(&self, key: &str) -> Result<Option<TeamVariable>> {
        Ok(self
            .all_variables()
            .await?
            .into_iter()
            .find(|v| v.key == key))
    }

    async fn all_variables(&self) -> Result<Vec<TeamVariable>> {
        let variables = &self.variables;
        let mut all = collect_pages(DEFAULT_PAGE_LIMIT, |page, limit| {
            variables.list_variables(page, limit)
        })
        .await?;
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::team_variables::mocks::InMemoryVariables;

    fn service() -> (EnvService, InMemoryVariables) {
        let store = InMemoryVariables::new();
        (EnvService::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_set_creates_then_updates() {
        let (env, store) = service();

        env.set_env_var("API_KEY", "one", true).await.unwrap();
        env.set_env_var("API_KEY", "two", false).await.unwrap();

        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value.as_deref(), Some("two"));
        // Update keeps the flag chosen on creation
        assert!(all[0].is_sensitive);
    }

    #[tokio::test]
    async fn test_env_vars_sorted_by_key() {
        let (env, _) = service();
        for key in ["ZETA", "ALPHA", "MID"] {
            env.set_env_var(key, key, false).await.unwrap();
        }

        let keys: Vec<_> = env
            .env_vars()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.key)
            .collect();
        assert_eq!(keys, vec!["ALPHA", "MID", "ZETA"]);
    }

    #[tokio::test]
    async fn test_env_vars_walks_every_page() {
        let (env, store) = service();
        for i in 0..(DEFAULT_PAGE_LIMIT + 5) {
            env.set_env_var(&format!("KEY_{:03}", i), "v", false)
                .await
                .unwrap();
        }
        let before = store.list_calls();

        let vars = env.env_vars().await.unwrap();
        assert_eq!(vars.len(), (DEFAULT_PAGE_LIMIT + 5) as usize);
        assert_eq!(store.list_calls() - before, 2);
    }

    #[tokio::test]
    async fn test_del_is_noop_for_missing_key() {
        let (env, store) = service();
        env.set_env_var("KEEP", "1", false).await.unwrap();

        assert!(!env.del_env_var("MISSING").await.unwrap());
        assert!(env.del_env_var("KEEP").await.unwrap());
        assert!(store.all().is_empty());
    }
}
