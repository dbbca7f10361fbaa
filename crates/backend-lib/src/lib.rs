// ============================
// slax-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the Slax application server:
//! configuration-driven wiring of the authentication strategies.

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod factory;
pub mod framework;
pub mod metrics;
pub mod model;
pub mod providers;
pub mod router;
pub mod storage;

use std::sync::Arc;

pub use crate::config::{AuthConfig, Settings};
pub use crate::coordinator::AuthCoordinator;
pub use crate::error::{AuthError, ConfigurationError};
pub use crate::factory::AuthProviderFactory;
pub use crate::framework::Framework;

/// Application state shared across all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Authentication coordinator, built once at boot
    pub coordinator: AuthCoordinator,
    /// Settings the application booted with
    pub settings: Arc<Settings>,
}
