// ==============================
// tests/unit/factory_tests.rs
// ==============================
//! Strategy selection and capability-hook wiring of `AuthProviderFactory`.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use slax_backend_lib::auth::{Credentials, HasherKind, NativeCookie, NativeSession};
use slax_backend_lib::config::{AuthConfig, GroupsConfig, ThrottlingConfig, UsersConfig};
use slax_backend_lib::model::{
    AttemptLimitHook, GroupModel, ModelRegistry, SuspensionTimeHook, ThrottleModel,
    UserGroupsPivotHook, UserModel, UserModelHook,
};
use slax_backend_lib::storage::MemoryStorage;
use slax_backend_lib::{AuthCoordinator, AuthProviderFactory, ConfigurationError};

fn scenario_config(hasher: &str) -> AuthConfig {
    AuthConfig {
        hasher: hasher.to_string(),
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
            suspension_time: Some(300),
        },
        user_groups_pivot_table: Some("user_groups".to_string()),
    }
}

fn build(factory: &AuthProviderFactory, config: &AuthConfig) -> Result<AuthCoordinator, ConfigurationError> {
    factory.build(
        config,
        Arc::new(NativeSession::default()),
        Arc::new(NativeCookie::new()),
        None,
    )
}

fn default_factory() -> AuthProviderFactory {
    AuthProviderFactory::new(ModelRegistry::default(), Arc::new(MemoryStorage::new()))
}

/// A user model that only supports the pivot hook and counts its invocations
#[derive(Debug)]
struct PivotOnlyUser {
    calls: Arc<AtomicUsize>,
}

impl UserModel for PivotOnlyUser {
    fn name(&self) -> &str {
        "PivotOnlyUser"
    }

    fn as_user_groups_pivot_hook(&mut self) -> Option<&mut dyn UserGroupsPivotHook> {
        Some(self)
    }
}

impl UserGroupsPivotHook for PivotOnlyUser {
    fn set_user_groups_pivot(&mut self, _table: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// A group model with no hooks at all
#[derive(Debug)]
struct BareGroup;

impl GroupModel for BareGroup {
    fn name(&self) -> &str {
        "BareGroup"
    }
}

/// A throttle model supporting attempt limit and user model, counting both
#[derive(Debug)]
struct CountingThrottle {
    calls: Arc<AtomicUsize>,
    limit: u32,
}

impl ThrottleModel for CountingThrottle {
    fn name(&self) -> &str {
        "CountingThrottle"
    }

    fn attempt_limit(&self) -> u32 {
        self.limit
    }

    fn as_attempt_limit_hook(&mut self) -> Option<&mut dyn AttemptLimitHook> {
        Some(self)
    }

    fn as_user_model_hook(&mut self) -> Option<&mut dyn UserModelHook> {
        Some(self)
    }
}

impl AttemptLimitHook for CountingThrottle {
    fn set_attempt_limit(&mut self, limit: u32) {
        self.limit = limit;
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl UserModelHook for CountingThrottle {
    fn set_user_model(&mut self, _model: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

// never registered as supported by CountingThrottle, so must never run
impl SuspensionTimeHook for CountingThrottle {
    fn set_suspension_time(&mut self, _time: Duration) {
        panic!("suspension hook is not declared by this model");
    }
}

#[test]
fn test_every_hasher_name_selects_its_strategy() {
    let factory = default_factory();
    for kind in HasherKind::ALL {
        let coordinator = build(&factory, &scenario_config(kind.as_str())).unwrap();
        assert_eq!(coordinator.hasher_kind(), kind);
    }
}

#[test]
fn test_unknown_hasher_fails_and_names_the_value() {
    let err = build(&default_factory(), &scenario_config("md5")).unwrap_err();
    assert_eq!(err, ConfigurationError::UnknownHasher("md5".to_string()));
    assert!(err.to_string().contains("md5"));

    for bogus in ["", "SHA256", "bcrypt ", "argon2"] {
        assert!(default_factory().select_hasher(&scenario_config(bogus)).is_err());
    }
}

#[test]
fn test_bcrypt_scenario_reports_attempt_limit() {
    let coordinator = build(&default_factory(), &scenario_config("bcrypt")).unwrap();
    assert_eq!(coordinator.hasher_kind(), HasherKind::Bcrypt);
    assert_eq!(coordinator.throttle().attempt_limit(), 5);
    assert_eq!(coordinator.throttle().suspension_time(), Duration::from_secs(300));
    assert!(coordinator.throttle().is_enabled());
    assert_eq!(coordinator.users().model().user_groups_pivot(), "user_groups");
    assert_eq!(coordinator.groups().model().user_groups_pivot(), "user_groups");
    assert_eq!(coordinator.groups().model().user_model(), Some("User"));
    assert_eq!(coordinator.throttle().model().user_model(), Some("User"));
}

#[test]
fn test_hooks_run_only_when_supported() {
    let user_calls = Arc::new(AtomicUsize::new(0));
    let throttle_calls = Arc::new(AtomicUsize::new(0));

    let mut registry = ModelRegistry::default();
    {
        let calls = user_calls.clone();
        registry.register_user("PivotOnlyUser", move || {
            Box::new(PivotOnlyUser {
                calls: calls.clone(),
            })
        });
    }
    registry.register_group("BareGroup", || Box::new(BareGroup));
    {
        let calls = throttle_calls.clone();
        registry.register_throttle("CountingThrottle", move || {
            Box::new(CountingThrottle {
                calls: calls.clone(),
                limit: 1,
            })
        });
    }

    let mut config = scenario_config("sha256");
    config.users.model = "PivotOnlyUser".to_string();
    config.groups.model = "BareGroup".to_string();
    config.throttling.model = "CountingThrottle".to_string();
    config.throttling.attempt_limit = Some(7);
    // values for unsupported hooks may be absent
    config.users.login_attribute = None;
    config.throttling.suspension_time = None;

    let factory = AuthProviderFactory::new(registry, Arc::new(MemoryStorage::new()));
    let coordinator = build(&factory, &config).unwrap();

    assert_eq!(user_calls.load(Ordering::SeqCst), 1);
    assert_eq!(throttle_calls.load(Ordering::SeqCst), 2);
    assert_eq!(coordinator.throttle().attempt_limit(), 7);
    assert_eq!(coordinator.users().login_attribute(), "email");
}

#[test]
fn test_disabled_throttling_never_reports_throttled() {
    let mut config = scenario_config("sha256");
    config.throttling.enabled = false;
    config.throttling.attempt_limit = Some(1);

    let coordinator = build(&default_factory(), &config).unwrap();
    assert!(!coordinator.throttle().is_enabled());

    let credentials = Credentials::new("a@b.c", "secret");
    coordinator.register(&credentials, true).unwrap();
    for _ in 0..20 {
        assert!(coordinator
            .login(&Credentials::new("a@b.c", "wrong"))
            .is_err());
        assert!(!coordinator.check_throttle("a@b.c"));
    }
    assert!(coordinator.login(&credentials).is_ok());
}

#[test]
fn test_build_is_deterministic() {
    let config = scenario_config("whirlpool");
    let first = build(&default_factory(), &config).unwrap();
    let second = build(&default_factory(), &config).unwrap();

    assert_eq!(first.hasher_kind(), second.hasher_kind());
    assert_eq!(first.users().model().name(), second.users().model().name());
    assert_eq!(first.users().login_attribute(), second.users().login_attribute());
    assert_eq!(first.groups().model().name(), second.groups().model().name());
    assert_eq!(first.throttle().attempt_limit(), second.throttle().attempt_limit());
    assert_eq!(first.throttle().suspension_time(), second.throttle().suspension_time());
    assert_eq!(first.throttle().is_enabled(), second.throttle().is_enabled());
}

#[test]
fn test_missing_or_unknown_keys_fail_the_whole_build() {
    let mut config = scenario_config("native");
    config.throttling.model = "Nope".to_string();
    assert_eq!(
        build(&default_factory(), &config).unwrap_err(),
        ConfigurationError::UnknownModel {
            kind: "throttle",
            name: "Nope".to_string()
        }
    );

    let mut config = scenario_config("native");
    config.users.model = String::new();
    assert_eq!(
        build(&default_factory(), &config).unwrap_err(),
        ConfigurationError::MissingKey("users.model")
    );

    let mut config = scenario_config("native");
    config.user_groups_pivot_table = None;
    assert_eq!(
        build(&default_factory(), &config).unwrap_err(),
        ConfigurationError::MissingKey("user_groups_pivot_table")
    );

    let mut config = scenario_config("native");
    config.throttling.suspension_time = None;
    assert_eq!(
        build(&default_factory(), &config).unwrap_err(),
        ConfigurationError::MissingKey("throttling.suspension_time")
    );
}
