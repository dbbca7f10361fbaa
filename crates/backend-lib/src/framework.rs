// ============================
// slax-backend-lib/src/framework.rs
// ============================
//! Boot sequence: turn loaded settings into shared application state.
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::auth::{NativeCookie, NativeSession};
use crate::config::Settings;
use crate::error::ConfigurationError;
use crate::factory::AuthProviderFactory;
use crate::model::ModelRegistry;
use crate::storage::{MemoryStorage, Storage};
use crate::AppState;

#[derive(Debug)]
pub struct Framework {
    settings: Settings,
    registry: ModelRegistry,
    storage: Arc<dyn Storage>,
}

impl Framework {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            registry: ModelRegistry::default(),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    /// Replace the model registry, e.g. to add application models
    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build the authentication coordinator and wrap it with the settings.
    ///
    /// The coordinator is built without a client address; request handlers
    /// scope it per request with `with_ip_address`.
    pub fn boot(self) -> Result<AppState, ConfigurationError> {
        info!(bind_addr = %self.settings.bind_addr, "booting framework");

        if self.settings.session_ttl_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "session_ttl_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        let session = Arc::new(NativeSession::new(Duration::from_secs(
            self.settings.session_ttl_secs,
        )));
        let cookie = Arc::new(NativeCookie::new());

        let factory = AuthProviderFactory::new(self.registry, self.storage);
        let coordinator = factory.build(&self.settings.auth, session, cookie, None)?;

        info!("framework booted");
        Ok(AppState {
            coordinator,
            settings: Arc::new(self.settings),
        })
    }
}
