//! Cookie backend for persist ("remember me") codes.
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use slax_common::RecordId;

use super::token_generator::generate_secure_token;

/// Storage for persist codes handed out on remembered logins
pub trait CookieStore: Send + Sync + fmt::Debug {
    /// Issue a new persist code for a user
    fn issue(&self, user_id: RecordId) -> String;

    /// Resolve a persist code to its user
    fn get(&self, code: &str) -> Option<RecordId>;

    /// Forget every code issued to a user, returning how many were dropped
    fn forget_user(&self, user_id: RecordId) -> usize;

    /// Drop expired codes, returning how many were removed
    fn purge_expired(&self) -> usize;
}

/// Lifetime of a persist code
pub const PERSIST_CODE_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30); // 30 days

#[derive(Debug, Clone, Copy)]
struct IssuedCode {
    user_id: RecordId,
    expires_at: SystemTime,
}

impl IssuedCode {
    fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}

/// In-process cookie jar
#[derive(Debug, Clone)]
pub struct NativeCookie {
    codes: Arc<DashMap<String, IssuedCode>>,
    ttl: Duration,
}

impl Default for NativeCookie {
    fn default() -> Self {
        Self::with_ttl(PERSIST_CODE_TTL)
    }
}

impl NativeCookie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            codes: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl CookieStore for NativeCookie {
    fn issue(&self, user_id: RecordId) -> String {
        let code = generate_secure_token();
        let issued = IssuedCode {
            user_id,
            expires_at: SystemTime::now() + self.ttl,
        };
        self.codes.insert(code.clone(), issued);
        code
    }

    fn get(&self, code: &str) -> Option<RecordId> {
        self.codes
            .get(code)
            .filter(|entry| !entry.value().is_expired())
            .map(|entry| entry.value().user_id)
    }

    fn forget_user(&self, user_id: RecordId) -> usize {
        let before = self.codes.len();
        self.codes.retain(|_, issued| issued.user_id != user_id);
        before - self.codes.len()
    }

    fn purge_expired(&self) -> usize {
        let before = self.codes.len();
        self.codes.retain(|_, issued| !issued.is_expired());
        before - self.codes.len()
    }
}
