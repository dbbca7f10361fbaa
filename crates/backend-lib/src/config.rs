// ============================
// slax-backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::Path;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides, nested keys split on `__`
pub const ENV_PREFIX: &str = "SLAX_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level
    pub log_level: String,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    /// Authentication provider selection
    pub auth: AuthConfig,
}

/// Declarative selection of the authentication strategies.
///
/// Optional fields are only read when the selected model declares the
/// capability hook that consumes them. The hasher and model names have no
/// default: when a source leaves them out they deserialize empty and the
/// factory rejects the build with `MissingKey`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// One of `native`, `bcrypt`, `sha256`, `whirlpool`
    #[serde(default)]
    pub hasher: String,
    #[serde(default)]
    pub users: UsersConfig,
    #[serde(default)]
    pub groups: GroupsConfig,
    pub throttling: ThrottlingConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_groups_pivot_table: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsersConfig {
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_attribute: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupsConfig {
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottlingConfig {
    #[serde(default)]
    pub model: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_limit: Option<u32>,
    /// Seconds a suspended user stays locked out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension_time: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            session_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            auth: AuthConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            hasher: "native".to_string(),
            users: UsersConfig {
                model: "User".to_string(),
                login_attribute: Some("email".to_string()),
            },
            groups: GroupsConfig {
                model: "Group".to_string(),
            },
            throttling: ThrottlingConfig {
                model: "Throttle".to_string(),
                enabled: true,
                attempt_limit: Some(5),
                suspension_time: Some(5 * 60),
            },
            user_groups_pivot_table: Some("users_groups".to_string()),
        }
    }
}

impl Settings {
    /// Load settings from `slax.{toml,yaml,json}` in the working directory and the environment
    pub fn load() -> Result<Self> {
        let figment = Self::defaults()
            .merge(Toml::file("slax.toml"))
            .merge(Yaml::file("slax.yaml"))
            .merge(Json::file("slax.json"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::extract(figment)
    }

    /// Load settings from an explicit file, the format picked by its extension
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::defaults().merge(Toml::file(path)),
            Some("yaml") | Some("yml") => Self::defaults().merge(Yaml::file(path)),
            Some("json") => Self::defaults().merge(Json::file(path)),
            _ => bail!("unsupported config format: {}", path.display()),
        };
        if !path.exists() {
            bail!("config file not found: {}", path.display());
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Validate settings that are not checked by the authentication factory
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log_level);
        }
        if self.session_ttl_secs == 0 {
            bail!("session_ttl_secs must be greater than zero");
        }
        Ok(())
    }

    /// Baseline layer. Strategy names are left out so a deployment has to
    /// choose them; only the tunables get a fallback.
    fn defaults() -> Figment {
        let base = Settings::default();
        let auth = base.auth;
        Figment::from(Serialized::default("bind_addr", base.bind_addr))
            .merge(Serialized::default("log_level", base.log_level))
            .merge(Serialized::default("session_ttl_secs", base.session_ttl_secs))
            .merge(Serialized::default("auth.users.login_attribute", auth.users.login_attribute))
            .merge(Serialized::default(
                "auth.user_groups_pivot_table",
                auth.user_groups_pivot_table,
            ))
            .merge(Serialized::default("auth.throttling.enabled", auth.throttling.enabled))
            .merge(Serialized::default(
                "auth.throttling.attempt_limit",
                auth.throttling.attempt_limit,
            ))
            .merge(Serialized::default(
                "auth.throttling.suspension_time",
                auth.throttling.suspension_time,
            ))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Load settings from the default sources
pub fn load_settings() -> Result<Settings> {
    Settings::load()
}
