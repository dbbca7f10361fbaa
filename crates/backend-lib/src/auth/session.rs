// ============================
// slax-backend-lib/src/auth/session.rs
// ============================
//! Session backend: who is logged in under which token.
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use metrics::{counter, gauge};
use parking_lot::RwLock;
use slax_common::RecordId;
use uuid::Uuid;

use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};

/// Session TTL (time to live)
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7); // 7 days

/// How often the background sweep drops expired sessions and persist codes
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Session information
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: Uuid,
    pub user_id: RecordId,
    pub login: String,
    pub ip_address: Option<IpAddr>,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl Session {
    pub fn new(user_id: RecordId, login: String, ip_address: Option<IpAddr>, ttl: Duration) -> Self {
        let now = SystemTime::now();
        Self {
            token: Uuid::new_v4(),
            user_id,
            login,
            ip_address,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    /// Time left before expiry, zero once expired
    pub fn expires_in(&self) -> Duration {
        self.expires_at
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO)
    }
}

/// Storage for live sessions
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// Lifetime given to new sessions
    fn ttl(&self) -> Duration;

    fn put(&self, session: Session);

    /// Fetch a session, ignoring expired ones
    fn get(&self, token: &Uuid) -> Option<Session>;

    /// Remove a session, returning whether it existed
    fn forget(&self, token: &Uuid) -> bool;

    /// Drop expired sessions, returning how many were removed
    fn purge_expired(&self) -> usize;
}

/// In-process session store
#[derive(Debug, Clone)]
pub struct NativeSession {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl Default for NativeSession {
    fn default() -> Self {
        Self::new(SESSION_TTL)
    }
}

impl NativeSession {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for NativeSession {
    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn put(&self, session: Session) {
        let mut sessions = self.sessions.write();
        sessions.insert(session.token, session);

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
    }

    fn get(&self, token: &Uuid) -> Option<Session> {
        self.sessions
            .read()
            .get(token)
            .filter(|session| !session.is_expired())
            .cloned()
    }

    fn forget(&self, token: &Uuid) -> bool {
        let mut sessions = self.sessions.write();
        let existed = sessions.remove(token).is_some();
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        existed
    }

    fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        let removed = before - sessions.len();

        if removed > 0 {
            counter!(SESSION_EXPIRED).increment(removed as u64);
            gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        }
        removed
    }
}
