// ============================
// crates/backend-lib/src/providers/throttling.rs
// ============================
//! Login throttling: failed-attempt counting, suspension and bans.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use slax_common::RecordId;
use tracing::{debug, warn};

use super::UserProvider;
use crate::error::AuthError;
use crate::metrics::THROTTLE_SUSPENDED;
use crate::model::ThrottleModel;
use crate::storage::{Storage, Throttle};

/// Throttle provider.
///
/// Always constructed; when disabled every check reports "not throttled" and
/// attempts are not recorded.
#[derive(Debug)]
pub struct ThrottleProvider {
    users: Arc<UserProvider>,
    model: Box<dyn ThrottleModel>,
    storage: Arc<dyn Storage>,
    enabled: AtomicBool,
}

impl ThrottleProvider {
    pub fn new(
        users: Arc<UserProvider>,
        model: Box<dyn ThrottleModel>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            users,
            model,
            storage,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn model(&self) -> &dyn ThrottleModel {
        self.model.as_ref()
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn attempt_limit(&self) -> u32 {
        self.model.attempt_limit()
    }

    pub fn suspension_time(&self) -> Duration {
        self.model.suspension_time()
    }

    /// Get the throttle row for a user, a fresh one if none was stored yet
    pub fn find_by_user_id(&self, user_id: RecordId, ip: Option<IpAddr>) -> Throttle {
        self.storage
            .throttle(user_id, ip)
            .unwrap_or_else(|| Throttle::new(user_id, ip))
    }

    pub fn find_by_login(&self, login: &str, ip: Option<IpAddr>) -> Result<Throttle, AuthError> {
        let user = self.users.find_by_login(login)?;
        Ok(self.find_by_user_id(user.id, ip))
    }

    /// Record a failed attempt, suspending once the limit is reached.
    ///
    /// The increment and the limit check run as one storage update, so
    /// concurrent failures for the same row are all counted. `throttle` is
    /// refreshed with the stored row.
    pub fn add_login_attempt(&self, throttle: &mut Throttle) {
        if !self.is_enabled() {
            return;
        }
        let limit = self.attempt_limit();
        let window = self.suspension_time();
        let mut suspended_now = false;

        *throttle = self.storage.update_throttle(
            throttle.user_id,
            throttle.ip_address,
            &mut |row| {
                let now = Instant::now();
                // attempts older than a suspension period no longer count
                if let Some(last) = row.last_attempt_at {
                    if now.duration_since(last) >= window {
                        row.attempts = 0;
                    }
                }
                row.attempts += 1;
                row.last_attempt_at = Some(now);

                if row.attempts >= limit && !row.suspended {
                    row.suspended = true;
                    row.suspended_at = Some(now);
                    suspended_now = true;
                }
            },
        );

        if suspended_now {
            self.report_suspension(throttle);
        }
    }

    pub fn clear_login_attempts(&self, throttle: &mut Throttle) {
        *throttle = self
            .storage
            .update_throttle(throttle.user_id, throttle.ip_address, &mut |row| {
                row.attempts = 0;
                row.last_attempt_at = None;
                row.suspended = false;
                row.suspended_at = None;
            });
    }

    /// Fail when the row is banned or still suspended; lift expired suspensions
    pub fn check(&self, throttle: &mut Throttle) -> Result<(), AuthError> {
        if !self.is_enabled() {
            return Ok(());
        }
        if throttle.banned {
            return Err(AuthError::UserBanned);
        }
        if throttle.suspended {
            let suspension = self.suspension_time();
            if let Some(left) = remaining(throttle, suspension) {
                return Err(AuthError::UserSuspended {
                    remaining_secs: left.as_secs() + u64::from(left.subsec_nanos() > 0),
                });
            }
            debug!(user_id = throttle.user_id, "suspension expired");
            // a fresh suspension stored meanwhile is left in place
            *throttle = self
                .storage
                .update_throttle(throttle.user_id, throttle.ip_address, &mut |row| {
                    if row.suspended && remaining(row, suspension).is_none() {
                        lift(row);
                    }
                });
        }
        Ok(())
    }

    /// Whether a login is currently blocked. Unknown logins are never throttled.
    pub fn is_throttled(&self, login: &str, ip: Option<IpAddr>) -> bool {
        if !self.is_enabled() {
            return false;
        }
        match self.find_by_login(login, ip) {
            Ok(mut throttle) => self.check(&mut throttle).is_err(),
            Err(_) => false,
        }
    }

    pub fn suspend(&self, throttle: &mut Throttle) {
        *throttle = self
            .storage
            .update_throttle(throttle.user_id, throttle.ip_address, &mut |row| {
                row.suspended = true;
                row.suspended_at = Some(Instant::now());
            });
        self.report_suspension(throttle);
    }

    pub fn unsuspend(&self, throttle: &mut Throttle) {
        *throttle = self
            .storage
            .update_throttle(throttle.user_id, throttle.ip_address, &mut |row| lift(row));
    }

    pub fn ban(&self, throttle: &mut Throttle) {
        *throttle = self
            .storage
            .update_throttle(throttle.user_id, throttle.ip_address, &mut |row| {
                row.banned = true;
            });
        warn!(user_id = throttle.user_id, "user banned");
    }

    pub fn unban(&self, throttle: &mut Throttle) {
        *throttle = self
            .storage
            .update_throttle(throttle.user_id, throttle.ip_address, &mut |row| {
                row.banned = false;
            });
    }

    fn report_suspension(&self, throttle: &Throttle) {
        counter!(THROTTLE_SUSPENDED).increment(1);
        warn!(
            user_id = throttle.user_id,
            ip = ?throttle.ip_address,
            attempts = throttle.attempts,
            "user suspended after failed login attempts"
        );
    }
}

/// Time left on a suspension, `None` once it has run out
fn remaining(throttle: &Throttle, suspension: Duration) -> Option<Duration> {
    let elapsed = throttle
        .suspended_at
        .map(|at| at.elapsed())
        .unwrap_or(Duration::MAX);
    suspension.checked_sub(elapsed).filter(|left| !left.is_zero())
}

fn lift(row: &mut Throttle) {
    row.suspended = false;
    row.suspended_at = None;
    row.attempts = 0;
    row.last_attempt_at = None;
}
