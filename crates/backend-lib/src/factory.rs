// ============================
// slax-backend-lib/src/factory.rs
// ============================
//! Configuration-driven selection and wiring of the authentication strategies.
//!
//! [`AuthProviderFactory::build`] runs once at startup. Any unknown name or
//! missing value fails the whole build; nothing half-built escapes, because
//! hooks only ever touch model instances owned by the build in progress.
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::auth::{hasher_for, CookieStore, Hasher, HasherKind, SessionStore};
use crate::config::AuthConfig;
use crate::coordinator::AuthCoordinator;
use crate::error::ConfigurationError;
use crate::model::ModelRegistry;
use crate::providers::{GroupProvider, ThrottleProvider, UserProvider};
use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct AuthProviderFactory {
    registry: ModelRegistry,
    storage: Arc<dyn Storage>,
}

impl AuthProviderFactory {
    pub fn new(registry: ModelRegistry, storage: Arc<dyn Storage>) -> Self {
        Self { registry, storage }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Pick the hasher named by `config.hasher`; no fallback
    pub fn select_hasher(&self, config: &AuthConfig) -> Result<Arc<dyn Hasher>, ConfigurationError> {
        let kind: HasherKind = required(&config.hasher, "hasher")?.parse()?;
        debug!(hasher = %kind, "selected hasher");
        Ok(Arc::from(hasher_for(kind)))
    }

    pub fn build_user_provider(
        &self,
        hasher: Arc<dyn Hasher>,
        config: &AuthConfig,
    ) -> Result<UserProvider, ConfigurationError> {
        let model_name = required(&config.users.model, "users.model")?;
        let mut model = self.registry.user_model(model_name)?;

        if let Some(hook) = model.as_login_attribute_hook() {
            let attribute = required_opt(&config.users.login_attribute, "users.login_attribute")?;
            hook.set_login_attribute_name(attribute);
        }
        if let Some(hook) = model.as_group_model_hook() {
            hook.set_group_model(required(&config.groups.model, "groups.model")?);
        }
        if let Some(hook) = model.as_user_groups_pivot_hook() {
            let table = required_opt(&config.user_groups_pivot_table, "user_groups_pivot_table")?;
            hook.set_user_groups_pivot(table);
        }

        debug!(
            model = model.name(),
            login_attribute = model.login_attribute(),
            group_model = model.group_model().unwrap_or("-"),
            "built user provider"
        );
        Ok(UserProvider::new(hasher, model, self.storage.clone()))
    }

    pub fn build_group_provider(&self, config: &AuthConfig) -> Result<GroupProvider, ConfigurationError> {
        let model_name = required(&config.groups.model, "groups.model")?;
        let mut model = self.registry.group_model(model_name)?;

        if let Some(hook) = model.as_user_model_hook() {
            hook.set_user_model(required(&config.users.model, "users.model")?);
        }
        if let Some(hook) = model.as_user_groups_pivot_hook() {
            let table = required_opt(&config.user_groups_pivot_table, "user_groups_pivot_table")?;
            hook.set_user_groups_pivot(table);
        }

        debug!(
            model = model.name(),
            user_model = model.user_model().unwrap_or("-"),
            "built group provider"
        );
        Ok(GroupProvider::new(model, self.storage.clone()))
    }

    pub fn build_throttle_provider(
        &self,
        users: Arc<UserProvider>,
        config: &AuthConfig,
    ) -> Result<ThrottleProvider, ConfigurationError> {
        let throttling = &config.throttling;
        let model_name = required(&throttling.model, "throttling.model")?;
        let mut model = self.registry.throttle_model(model_name)?;

        if let Some(hook) = model.as_attempt_limit_hook() {
            let limit = throttling
                .attempt_limit
                .ok_or(ConfigurationError::MissingKey("throttling.attempt_limit"))?;
            if limit == 0 {
                return Err(ConfigurationError::InvalidValue {
                    key: "throttling.attempt_limit",
                    reason: "must be at least 1".to_string(),
                });
            }
            hook.set_attempt_limit(limit);
        }
        if let Some(hook) = model.as_suspension_time_hook() {
            let secs = throttling
                .suspension_time
                .ok_or(ConfigurationError::MissingKey("throttling.suspension_time"))?;
            hook.set_suspension_time(Duration::from_secs(secs));
        }
        if let Some(hook) = model.as_user_model_hook() {
            hook.set_user_model(required(&config.users.model, "users.model")?);
        }

        let provider = ThrottleProvider::new(users, model, self.storage.clone());
        if !throttling.enabled {
            provider.disable();
        }

        debug!(
            model = provider.model().name(),
            user_model = provider.model().user_model().unwrap_or("-"),
            enabled = provider.is_enabled(),
            attempt_limit = provider.attempt_limit(),
            "built throttle provider"
        );
        Ok(provider)
    }

    /// Wire a coordinator: hasher, then users, then groups, then throttling
    pub fn build(
        &self,
        config: &AuthConfig,
        session: Arc<dyn SessionStore>,
        cookie: Arc<dyn CookieStore>,
        ip_address: Option<IpAddr>,
    ) -> Result<AuthCoordinator, ConfigurationError> {
        let hasher = self.select_hasher(config)?;
        let users = Arc::new(self.build_user_provider(hasher, config)?);
        let groups = Arc::new(self.build_group_provider(config)?);
        let throttle = Arc::new(self.build_throttle_provider(users.clone(), config)?);

        info!(
            hasher = %config.hasher,
            users = %config.users.model,
            groups = %config.groups.model,
            throttling = throttle.is_enabled(),
            "authentication coordinator ready"
        );
        Ok(AuthCoordinator::new(
            users, groups, throttle, session, cookie, ip_address,
        ))
    }
}

fn required<'a>(value: &'a str, key: &'static str) -> Result<&'a str, ConfigurationError> {
    if value.trim().is_empty() {
        return Err(ConfigurationError::MissingKey(key));
    }
    Ok(value)
}

fn required_opt<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, ConfigurationError> {
    required(value.as_deref().unwrap_or_default(), key)
}
