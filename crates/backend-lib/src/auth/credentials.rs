//! Login credentials.
use std::fmt;

use zeroize::Zeroizing;

use crate::error::AuthError;

/// A login plus a plain-text password that is wiped on drop
#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Reject empty logins and passwords
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.login.trim().is_empty() {
            return Err(AuthError::LoginRequired);
        }
        if self.password.is_empty() {
            return Err(AuthError::PasswordRequired);
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl From<slax_common::LoginRequest> for Credentials {
    fn from(req: slax_common::LoginRequest) -> Self {
        Self::new(req.login, req.password)
    }
}
