use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{MemoryStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(MemoryStore::new()) as Arc<dyn Store>;
        Ok(Self { store, config })
    }

    /// State with a fresh in-memory store and a fixed test secret.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::JwtConfig;

        let config = Arc::new(AppConfig {
            environment: "test".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                ttl_days: 7,
            },
        });
        Self {
            store: Arc::new(MemoryStore::new()),
            config,
        }
    }
}
