// ==============================
// tests/integration/auth_flow_tests.rs
// ==============================
//! End-to-end login flows through a booted framework.
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Barrier;
use std::thread;

use slax_backend_lib::auth::Credentials;
use slax_backend_lib::{AuthError, Framework, Settings};

fn booted(attempt_limit: u32) -> slax_backend_lib::AppState {
    let mut settings = Settings::default();
    settings.auth.hasher = "sha256".to_string();
    settings.auth.throttling.attempt_limit = Some(attempt_limit);
    Framework::new(settings).boot().unwrap()
}

#[test]
fn test_failed_logins_suspend_then_block_correct_password() {
    let state = booted(3);
    let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1));
    let auth = state.coordinator.with_ip_address(ip);

    let good = Credentials::new("lifter@example.com", "SecureP@ssw0rd");
    let bad = Credentials::new("lifter@example.com", "nope");
    auth.register(&good, true).unwrap();

    for _ in 0..3 {
        assert!(matches!(auth.login(&bad), Err(AuthError::WrongPassword)));
    }
    assert!(auth.check_throttle("lifter@example.com"));
    assert!(matches!(
        auth.login(&good),
        Err(AuthError::UserSuspended { .. })
    ));

    // throttling is per client address
    let other = state
        .coordinator
        .with_ip_address(IpAddr::V4(Ipv4Addr::new(192, 168, 0, 2)));
    assert!(!other.check_throttle("lifter@example.com"));
    assert!(other.login(&good).is_ok());
}

#[test]
fn test_successful_login_clears_attempts() {
    let state = booted(3);
    let auth = &state.coordinator;
    let good = Credentials::new("lifter@example.com", "SecureP@ssw0rd");
    let bad = Credentials::new("lifter@example.com", "nope");
    auth.register(&good, true).unwrap();

    for _ in 0..2 {
        assert!(auth.login(&bad).is_err());
    }
    assert!(auth.login(&good).is_ok());

    // two more failures stay under the limit again
    for _ in 0..2 {
        assert!(auth.login(&bad).is_err());
    }
    assert!(!auth.check_throttle("lifter@example.com"));
    assert!(auth.login(&good).is_ok());
}

#[test]
fn test_banned_user_is_rejected() {
    let state = booted(5);
    let auth = &state.coordinator;
    let good = Credentials::new("lifter@example.com", "SecureP@ssw0rd");
    auth.register(&good, true).unwrap();

    let mut row = auth
        .throttle()
        .find_by_login("lifter@example.com", None)
        .unwrap();
    auth.throttle().ban(&mut row);

    assert!(matches!(auth.login(&good), Err(AuthError::UserBanned)));
    assert!(auth.check_throttle("lifter@example.com"));
}

#[test]
fn test_missing_credentials_and_unknown_users() {
    let state = booted(5);
    let auth = &state.coordinator;

    assert!(matches!(
        auth.login(&Credentials::new("", "pw")),
        Err(AuthError::LoginRequired)
    ));
    assert!(matches!(
        auth.login(&Credentials::new("who@example.com", "")),
        Err(AuthError::PasswordRequired)
    ));
    assert!(matches!(
        auth.login(&Credentials::new("who@example.com", "pw")),
        Err(AuthError::UserNotFound)
    ));
    assert!(!auth.check_throttle("who@example.com"));
}

#[test]
fn test_concurrent_wrong_passwords_cannot_outrun_the_limit() {
    let state = booted(5);
    let auth = &state.coordinator;
    let good = Credentials::new("lifter@example.com", "SecureP@ssw0rd");
    let bad = Credentials::new("lifter@example.com", "nope");
    auth.register(&good, true).unwrap();

    let barrier = Barrier::new(20);
    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..20)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    auth.login(&bad).unwrap_err()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let wrong = outcomes
        .iter()
        .filter(|err| matches!(err, AuthError::WrongPassword))
        .count();
    assert!(outcomes.iter().all(|err| matches!(
        err,
        AuthError::WrongPassword | AuthError::UserSuspended { .. }
    )));

    // every wrong password landed in the stored row
    let row = auth
        .throttle()
        .find_by_login("lifter@example.com", None)
        .unwrap();
    assert_eq!(row.attempts as usize, wrong);
    assert!(row.suspended);
    assert!(auth.check_throttle("lifter@example.com"));
    assert!(matches!(
        auth.login(&good),
        Err(AuthError::UserSuspended { .. })
    ));
}
