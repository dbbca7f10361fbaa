// crates/backend-lib/src/error.rs

//! Central error types + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use slax_common::{ErrorBody, ErrorDetail};
use thiserror::Error;

/// Startup-time misconfiguration. Always aborts the boot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid hasher [{0}] chosen for authentication")]
    UnknownHasher(String),

    #[error("Unknown {kind} model [{name}]")]
    UnknownModel { kind: &'static str, name: String },

    #[error("Missing required configuration key [{0}]")]
    MissingKey(&'static str),

    #[error("Invalid value for [{key}]: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Authentication error types with error codes and context
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("A login is required")]
    LoginRequired,

    #[error("A password is required")]
    PasswordRequired,

    #[error("User was not found")]
    UserNotFound,

    #[error("Wrong password")]
    WrongPassword,

    #[error("User is not activated")]
    UserNotActivated,

    #[error("User is suspended for another {remaining_secs} seconds")]
    UserSuspended { remaining_secs: u64 },

    #[error("User is banned")]
    UserBanned,

    #[error("A user with this login already exists")]
    UserExists,

    #[error("A group named [{0}] already exists")]
    GroupExists(String),

    #[error("Group was not found")]
    GroupNotFound,

    #[error("Session is missing or expired")]
    NotLoggedIn,

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::LoginRequired | AuthError::PasswordRequired => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound
            | AuthError::WrongPassword
            | AuthError::NotLoggedIn => StatusCode::UNAUTHORIZED,
            AuthError::UserNotActivated | AuthError::UserBanned => StatusCode::FORBIDDEN,
            AuthError::UserSuspended { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::UserExists | AuthError::GroupExists(_) => StatusCode::CONFLICT,
            AuthError::GroupNotFound => StatusCode::NOT_FOUND,
            AuthError::Hashing(_) | AuthError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::LoginRequired => "AUTH_001",
            AuthError::PasswordRequired => "AUTH_002",
            AuthError::UserNotFound => "AUTH_003",
            AuthError::WrongPassword => "AUTH_004",
            AuthError::UserNotActivated => "AUTH_005",
            AuthError::UserSuspended { .. } => "THROTTLE_001",
            AuthError::UserBanned => "THROTTLE_002",
            AuthError::UserExists => "USER_001",
            AuthError::GroupExists(_) => "GROUP_001",
            AuthError::GroupNotFound => "GROUP_002",
            AuthError::NotLoggedIn => "SESSION_001",
            AuthError::Hashing(_) => "HASH_001",
            AuthError::Configuration(_) => "CONFIG_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            // Never reveal which half of the credentials was wrong
            AuthError::UserNotFound | AuthError::WrongPassword => {
                "Authentication failed".to_string()
            },
            AuthError::UserSuspended { .. } => {
                "Too many authentication attempts, please try again later".to_string()
            },
            AuthError::Hashing(_) | AuthError::Configuration(_) => {
                "An internal server error occurred".to_string()
            },
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, axum::Json(body)).into_response()
    }
}
