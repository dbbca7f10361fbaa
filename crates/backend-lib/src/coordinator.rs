// ============================
// slax-backend-lib/src/coordinator.rs
// ============================
//! The facade request handlers use to log users in and out.
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use slax_common::{RecordId, UserView};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{CookieStore, Credentials, HasherKind, Session, SessionStore};
use crate::error::AuthError;
use crate::metrics::{LOGIN_FAILED, LOGIN_SUCCEEDED, LOGOUT};
use crate::providers::{GroupProvider, ThrottleProvider, UserProvider};
use crate::storage::User;

/// Outcome of a remembered login
#[derive(Debug, Clone, PartialEq)]
pub struct RememberedLogin {
    pub session: Session,
    pub persist_code: String,
}

/// Composes the providers with the session and cookie backends.
///
/// Cloning is cheap and every clone shares the same providers and stores;
/// [`AuthCoordinator::with_ip_address`] uses this to scope a request to its
/// client address.
#[derive(Debug, Clone)]
pub struct AuthCoordinator {
    users: Arc<UserProvider>,
    groups: Arc<GroupProvider>,
    throttle: Arc<ThrottleProvider>,
    session: Arc<dyn SessionStore>,
    cookie: Arc<dyn CookieStore>,
    ip_address: Option<IpAddr>,
}

impl AuthCoordinator {
    pub fn new(
        users: Arc<UserProvider>,
        groups: Arc<GroupProvider>,
        throttle: Arc<ThrottleProvider>,
        session: Arc<dyn SessionStore>,
        cookie: Arc<dyn CookieStore>,
        ip_address: Option<IpAddr>,
    ) -> Self {
        Self {
            users,
            groups,
            throttle,
            session,
            cookie,
            ip_address,
        }
    }

    /// Same providers and stores, different client address
    pub fn with_ip_address(&self, ip_address: IpAddr) -> Self {
        Self {
            ip_address: Some(ip_address),
            ..self.clone()
        }
    }

    pub fn ip_address(&self) -> Option<IpAddr> {
        self.ip_address
    }

    pub fn hasher_kind(&self) -> HasherKind {
        self.users.hasher().kind()
    }

    pub fn users(&self) -> &UserProvider {
        &self.users
    }

    pub fn groups(&self) -> &GroupProvider {
        &self.groups
    }

    pub fn throttle(&self) -> &ThrottleProvider {
        &self.throttle
    }

    /// Create a user from credentials
    pub fn register(&self, credentials: &Credentials, activate: bool) -> Result<User, AuthError> {
        credentials.validate()?;
        self.users.create(credentials, activate)
    }

    pub fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.authenticate(credentials)
    }

    /// Log in and also issue a persist code
    pub fn login_and_remember(&self, credentials: &Credentials) -> Result<RememberedLogin, AuthError> {
        let session = self.authenticate(credentials)?;
        let persist_code = self.cookie.issue(session.user_id);
        Ok(RememberedLogin {
            session,
            persist_code,
        })
    }

    /// Start a new session from a persist code issued by a remembered login
    pub fn login_with_persist_code(&self, code: &str) -> Result<Session, AuthError> {
        let user_id = self.cookie.get(code).ok_or(AuthError::NotLoggedIn)?;
        let mut user = self.users.find_by_id(user_id)?;
        if !user.activated {
            return Err(AuthError::UserNotActivated);
        }
        if self.throttle.is_enabled() {
            let mut throttle = self.throttle.find_by_user_id(user.id, self.ip_address);
            self.throttle.check(&mut throttle)?;
        }
        Ok(self.start_session(&mut user))
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        credentials.validate()?;

        self.verify(credentials).inspect_err(|err| {
            counter!(LOGIN_FAILED).increment(1);
            warn!(login = %credentials.login, ip = ?self.ip_address, error = %err, "login failed");
        })
    }

    fn verify(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let mut throttle = None;
        if self.throttle.is_enabled() {
            let mut row = self.throttle.find_by_login(&credentials.login, self.ip_address)?;
            self.throttle.check(&mut row)?;
            throttle = Some(row);
        }

        let mut user = match self.users.find_by_credentials(credentials) {
            Ok(user) => user,
            Err(err) => {
                if let (AuthError::WrongPassword, Some(row)) = (&err, throttle.as_mut()) {
                    self.throttle.add_login_attempt(row);
                }
                return Err(err);
            },
        };

        if let Some(row) = throttle.as_mut() {
            self.throttle.clear_login_attempts(row);
        }

        if !user.activated {
            return Err(AuthError::UserNotActivated);
        }

        Ok(self.start_session(&mut user))
    }

    fn start_session(&self, user: &mut User) -> Session {
        self.users.record_login(user);

        let login = user
            .attribute(self.users.login_attribute())
            .unwrap_or_default()
            .to_string();
        let session = Session::new(user.id, login, self.ip_address, self.session.ttl());
        self.session.put(session.clone());

        counter!(LOGIN_SUCCEEDED).increment(1);
        info!(user_id = user.id, ip = ?self.ip_address, "user logged in");
        session
    }

    /// End a session and drop the user's persist codes
    pub fn logout(&self, session: &Session) {
        let existed = self.session.forget(&session.token);
        let codes = self.cookie.forget_user(session.user_id);
        if existed {
            counter!(LOGOUT).increment(1);
        }
        info!(user_id = session.user_id, codes, "user logged out");
    }

    /// The live session behind a token
    pub fn session(&self, token: &Uuid) -> Option<Session> {
        self.session.get(token)
    }

    /// The activated user behind a live session
    pub fn check(&self, token: &Uuid) -> Option<User> {
        let session = self.session.get(token)?;
        self.users
            .find_by_id(session.user_id)
            .ok()
            .filter(|user| user.activated)
    }

    /// Drop expired sessions and persist codes, returning how many of each
    pub fn purge_expired(&self) -> (usize, usize) {
        let sessions = self.session.purge_expired();
        let codes = self.cookie.purge_expired();
        if sessions > 0 || codes > 0 {
            debug!(sessions, codes, "purged expired credentials");
        }
        (sessions, codes)
    }

    /// Run [`AuthCoordinator::purge_expired`] every `interval` until the
    /// returned task is aborted. Must be called inside a tokio runtime.
    pub fn spawn_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                coordinator.purge_expired();
            }
        })
    }

    /// Whether a login is currently throttled; always `false` when disabled
    pub fn check_throttle(&self, login: &str) -> bool {
        self.throttle.is_throttled(login, self.ip_address)
    }

    /// Permissions merged over the user's groups; user entries override them
    pub fn merged_permissions(&self, user: &User) -> BTreeMap<String, bool> {
        let mut merged = BTreeMap::new();
        for group in self.groups_of(user.id) {
            for (permission, granted) in group.permissions {
                let entry = merged.entry(permission).or_insert(false);
                *entry |= granted;
            }
        }
        for (permission, granted) in &user.permissions {
            merged.insert(permission.clone(), *granted);
        }
        merged
    }

    pub fn has_access(&self, user: &User, permission: &str) -> bool {
        self.merged_permissions(user)
            .get(permission)
            .copied()
            .unwrap_or(false)
    }

    pub fn add_to_group(&self, user_id: RecordId, group_name: &str) -> Result<bool, AuthError> {
        let group = self.groups.find_by_name(group_name)?;
        Ok(self.users.add_group(user_id, &group))
    }

    fn groups_of(&self, user_id: RecordId) -> Vec<crate::storage::Group> {
        self.users
            .group_ids(user_id)
            .into_iter()
            .filter_map(|id| self.groups.find_by_id(id).ok())
            .collect()
    }

    /// Public projection used by the HTTP surface
    pub fn view(&self, user: &User) -> UserView {
        UserView {
            id: user.id,
            login: user
                .attribute(self.users.login_attribute())
                .unwrap_or_default()
                .to_string(),
            activated: user.activated,
            groups: self.groups_of(user.id).into_iter().map(|g| g.name).collect(),
        }
    }
}
