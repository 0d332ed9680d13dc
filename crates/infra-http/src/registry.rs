// Process-wide cache of API clients keyed by configuration

use crate::api::YepCodeApi;
use crate::config::ApiConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use yepcode_core::error::Result;

/// Hands out one shared `YepCodeApi` per distinct configuration
///
/// Two facades built from equal configurations share the client, its
/// connection pool and its cached access token.
#[derive(Debug, Default)]
pub struct ApiRegistry {
    clients: Mutex<HashMap<String, Arc<YepCodeApi>>>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached client for `config`, built on first use
    ///
    /// A configuration that fails to resolve is not cached.
    pub fn get_or_init(&self, config: &ApiConfig) -> Result<Arc<YepCodeApi>> {
        let key = config.cache_key();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = clients.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let api = Arc::new(YepCodeApi::from_config(config)?);
        debug!(team_id = %api.team_id(), cached = clients.len() + 1, "API client created");
        clients.insert(key, Arc::clone(&api));
        Ok(api)
    }

    pub fn len(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.clients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
