// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared between the Slax HTTP surface and its clients.
//! This module defines the JSON bodies exchanged by the authentication routes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric identifier of a stored user or group
pub type RecordId = u64;

/// Body of `POST /login`
/// # Fields
/// * `login` - Value of the configured login attribute (email by default)
/// * `password` - Plain-text password, hashed server side
/// * `remember` - Also issue a long-lived persist cookie
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

/// Successful login reply
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoginResponse {
    /// Session token to send back as a bearer token
    pub token: Uuid,
    pub user: UserView,
    /// Seconds until the session expires
    pub expires_in: u64,
    /// Persist code set when `remember` was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_code: Option<String>,
}

/// Public projection of a stored user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserView {
    pub id: RecordId,
    pub login: String,
    pub activated: bool,
    pub groups: Vec<String>,
}

/// Error envelope returned by every failing route
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Health check reply
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Health {
    pub status: String,
    pub hasher: String,
    pub throttling: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_defaults_remember_to_false() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"login":"a@b.c","password":"secret"}"#).unwrap();
        assert!(!req.remember);
        assert_eq!(req.login, "a@b.c");
    }

    #[test]
    fn persist_code_is_omitted_when_absent() {
        let resp = LoginResponse {
            token: Uuid::nil(),
            user: UserView {
                id: 1,
                login: "a@b.c".into(),
                activated: true,
                groups: vec![],
            },
            expires_in: 60,
            persist_code: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("persist_code").is_none());
    }
}
