// Team Variables Port (Interface)

use crate::domain::{CreateVariableInput, Page, TeamVariable, UpdateVariableInput};
use crate::error::Result;
use async_trait::async_trait;

/// Team variable storage on the platform
#[async_trait]
pub trait TeamVariables: Send + Sync {
    /// One page of team variables
    async fn list_variables(&self, page: u32, limit: u32) -> Result<Page<TeamVariable>>;

    async fn create_variable(&self, input: CreateVariableInput) -> Result<TeamVariable>;

    async fn update_variable(&self, id: &str, input: UpdateVariableInput) -> Result<TeamVariable>;

    async fn delete_variable(&self, id: &str) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::{Arc, Mutex};

    /// In-memory variable store, insertion ordered
    #[derive(Clone, Default)]
    pub struct InMemoryVariables {
        variables: Arc<Mutex<Vec<TeamVariable>>>,
        next_id: Arc<Mutex<u64>>,
        list_calls: Arc<Mutex<usize>>,
    }

    impl InMemoryVariables {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn all(&self) -> Vec<TeamVariable> {
            self.variables.lock().unwrap().clone()
        }

        pub fn list_calls(&self) -> usize {
            *self.list_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TeamVariables for InMemoryVariables {
        async fn list_variables(&self, page: u32, limit: u32) -> Result<Page<TeamVariable>> {
            *self.list_calls.lock().unwrap() += 1;
            let variables = self.variables.lock().unwrap();
            let start = (page * limit) as usize;
            let data: Vec<_> = variables
                .iter()
                .skip(start)
                .take(limit as usize)
                .cloned()
                .collect();
            let has_next_page = start + data.len() < variables.len();
            Ok(Page::new(data, has_next_page))
        }

        async fn create_variable(&self, input: CreateVariableInput) -> Result<TeamVariable> {
            let id = {
                let mut next_id = self.next_id.lock().unwrap();
                *next_id += 1;
                format!("var-{}", next_id)
            };
            let variable = TeamVariable {
                id,
                key: input.key,
                value: Some(input.value),
                is_sensitive: input.is_sensitive,
            };
            self.variables.lock().unwrap().push(variable.clone());
            Ok(variable)
        }

        async fn update_variable(
            &self,
            id: &str,
            input: UpdateVariableInput,
        ) -> Result<TeamVariable> {
            let mut variables = self.variables.lock().unwrap();
            let variable = variables
                .iter_mut()
                .find(|v| v.id == id)
                .ok_or_else(|| AppError::NotFound(format!("variable {}", id)))?;
            variable.key = input.key;
            variable.value = Some(input.value);
            Ok(variable.clone())
        }

        async fn delete_variable(&self, id: &str) -> Result<()> {
            let mut variables = self.variables.lock().unwrap();
            let before = variables.len();
            variables.retain(|v| v.id != id);
            if variables.len() == before {
                return Err(AppError::NotFound(format!("variable {}", id)));
            }
            Ok(())
        }
    }
}
