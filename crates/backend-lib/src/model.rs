// ============================
// slax-backend-lib/src/model.rs
// ============================
//! Model types and their optional capability hooks.
//!
//! A model type may receive extra configuration through a small set of hook
//! traits. Each model trait exposes one `as_*_hook` accessor per hook it may
//! support; the default returns `None`, meaning the model keeps its defaults.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigurationError;

pub const DEFAULT_LOGIN_ATTRIBUTE: &str = "email";
pub const DEFAULT_USER_GROUPS_PIVOT: &str = "users_groups";
/// Default number of failed attempts before suspension
pub const DEFAULT_ATTEMPT_LIMIT: u32 = 5;
/// Default suspension (5 minutes)
pub const DEFAULT_SUSPENSION_TIME: Duration = Duration::from_secs(5 * 60);

/// Receives the attribute used as the login name
pub trait LoginAttributeHook {
    fn set_login_attribute_name(&mut self, name: &str);
}

/// Receives the identifier of the group model
pub trait GroupModelHook {
    fn set_group_model(&mut self, model: &str);
}

/// Receives the name of the user/group pivot table
pub trait UserGroupsPivotHook {
    fn set_user_groups_pivot(&mut self, table: &str);
}

/// Receives the identifier of the user model
pub trait UserModelHook {
    fn set_user_model(&mut self, model: &str);
}

/// Receives the failed-attempt limit
pub trait AttemptLimitHook {
    fn set_attempt_limit(&mut self, limit: u32);
}

/// Receives the suspension length
pub trait SuspensionTimeHook {
    fn set_suspension_time(&mut self, time: Duration);
}

/// A user model type as seen by the user provider
pub trait UserModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn login_attribute(&self) -> &str {
        DEFAULT_LOGIN_ATTRIBUTE
    }

    fn user_groups_pivot(&self) -> &str {
        DEFAULT_USER_GROUPS_PIVOT
    }

    /// Model the user side of the membership relation points at. Only
    /// recorded for a persistence layer that resolves relations by model
    /// name; `MemoryStorage` keys memberships by pivot table alone.
    fn group_model(&self) -> Option<&str> {
        None
    }

    fn as_login_attribute_hook(&mut self) -> Option<&mut dyn LoginAttributeHook> {
        None
    }

    fn as_group_model_hook(&mut self) -> Option<&mut dyn GroupModelHook> {
        None
    }

    fn as_user_groups_pivot_hook(&mut self) -> Option<&mut dyn UserGroupsPivotHook> {
        None
    }
}

/// A group model type as seen by the group provider
pub trait GroupModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn user_groups_pivot(&self) -> &str {
        DEFAULT_USER_GROUPS_PIVOT
    }

    /// Inverse of [`UserModel::group_model`]
    fn user_model(&self) -> Option<&str> {
        None
    }

    fn as_user_model_hook(&mut self) -> Option<&mut dyn UserModelHook> {
        None
    }

    fn as_user_groups_pivot_hook(&mut self) -> Option<&mut dyn UserGroupsPivotHook> {
        None
    }
}

/// A throttle model type as seen by the throttle provider
pub trait ThrottleModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn attempt_limit(&self) -> u32 {
        DEFAULT_ATTEMPT_LIMIT
    }

    fn suspension_time(&self) -> Duration {
        DEFAULT_SUSPENSION_TIME
    }

    /// Model whose rows the throttle rows belong to
    fn user_model(&self) -> Option<&str> {
        None
    }

    fn as_attempt_limit_hook(&mut self) -> Option<&mut dyn AttemptLimitHook> {
        None
    }

    fn as_suspension_time_hook(&mut self) -> Option<&mut dyn SuspensionTimeHook> {
        None
    }

    fn as_user_model_hook(&mut self) -> Option<&mut dyn UserModelHook> {
        None
    }
}

/// Built-in user model, supports every user hook
#[derive(Debug, Clone)]
pub struct DefaultUserModel {
    login_attribute: String,
    group_model: Option<String>,
    pivot: String,
}

impl Default for DefaultUserModel {
    fn default() -> Self {
        Self {
            login_attribute: DEFAULT_LOGIN_ATTRIBUTE.to_string(),
            group_model: None,
            pivot: DEFAULT_USER_GROUPS_PIVOT.to_string(),
        }
    }
}

impl UserModel for DefaultUserModel {
    fn name(&self) -> &str {
        "User"
    }

    fn login_attribute(&self) -> &str {
        &self.login_attribute
    }

    fn user_groups_pivot(&self) -> &str {
        &self.pivot
    }

    fn group_model(&self) -> Option<&str> {
        self.group_model.as_deref()
    }

    fn as_login_attribute_hook(&mut self) -> Option<&mut dyn LoginAttributeHook> {
        Some(self)
    }

    fn as_group_model_hook(&mut self) -> Option<&mut dyn GroupModelHook> {
        Some(self)
    }

    fn as_user_groups_pivot_hook(&mut self) -> Option<&mut dyn UserGroupsPivotHook> {
        Some(self)
    }
}

impl LoginAttributeHook for DefaultUserModel {
    fn set_login_attribute_name(&mut self, name: &str) {
        self.login_attribute = name.to_string();
    }
}

impl GroupModelHook for DefaultUserModel {
    fn set_group_model(&mut self, model: &str) {
        self.group_model = Some(model.to_string());
    }
}

impl UserGroupsPivotHook for DefaultUserModel {
    fn set_user_groups_pivot(&mut self, table: &str) {
        self.pivot = table.to_string();
    }
}

/// Built-in group model, supports every group hook
#[derive(Debug, Clone)]
pub struct DefaultGroupModel {
    user_model: Option<String>,
    pivot: String,
}

impl Default for DefaultGroupModel {
    fn default() -> Self {
        Self {
            user_model: None,
            pivot: DEFAULT_USER_GROUPS_PIVOT.to_string(),
        }
    }
}

impl GroupModel for DefaultGroupModel {
    fn name(&self) -> &str {
        "Group"
    }

    fn user_groups_pivot(&self) -> &str {
        &self.pivot
    }

    fn user_model(&self) -> Option<&str> {
        self.user_model.as_deref()
    }

    fn as_user_model_hook(&mut self) -> Option<&mut dyn UserModelHook> {
        Some(self)
    }

    fn as_user_groups_pivot_hook(&mut self) -> Option<&mut dyn UserGroupsPivotHook> {
        Some(self)
    }
}

impl UserModelHook for DefaultGroupModel {
    fn set_user_model(&mut self, model: &str) {
        self.user_model = Some(model.to_string());
    }
}

impl UserGroupsPivotHook for DefaultGroupModel {
    fn set_user_groups_pivot(&mut self, table: &str) {
        self.pivot = table.to_string();
    }
}

/// Built-in throttle model, supports every throttle hook
#[derive(Debug, Clone)]
pub struct DefaultThrottleModel {
    attempt_limit: u32,
    suspension_time: Duration,
    user_model: Option<String>,
}

impl Default for DefaultThrottleModel {
    fn default() -> Self {
        Self {
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
            suspension_time: DEFAULT_SUSPENSION_TIME,
            user_model: None,
        }
    }
}

impl ThrottleModel for DefaultThrottleModel {
    fn name(&self) -> &str {
        "Throttle"
    }

    fn attempt_limit(&self) -> u32 {
        self.attempt_limit
    }

    fn suspension_time(&self) -> Duration {
        self.suspension_time
    }

    fn user_model(&self) -> Option<&str> {
        self.user_model.as_deref()
    }

    fn as_attempt_limit_hook(&mut self) -> Option<&mut dyn AttemptLimitHook> {
        Some(self)
    }

    fn as_suspension_time_hook(&mut self) -> Option<&mut dyn SuspensionTimeHook> {
        Some(self)
    }

    fn as_user_model_hook(&mut self) -> Option<&mut dyn UserModelHook> {
        Some(self)
    }
}

impl AttemptLimitHook for DefaultThrottleModel {
    fn set_attempt_limit(&mut self, limit: u32) {
        self.attempt_limit = limit;
    }
}

impl SuspensionTimeHook for DefaultThrottleModel {
    fn set_suspension_time(&mut self, time: Duration) {
        self.suspension_time = time;
    }
}

impl UserModelHook for DefaultThrottleModel {
    fn set_user_model(&mut self, model: &str) {
        self.user_model = Some(model.to_string());
    }
}

type Constructor<T> = Arc<dyn Fn() -> Box<T> + Send + Sync>;

/// Model identifiers resolvable from configuration.
///
/// Every lookup hands out a fresh instance, so hooks applied during one
/// build never leak into another.
#[derive(Clone)]
pub struct ModelRegistry {
    users: HashMap<String, Constructor<dyn UserModel>>,
    groups: HashMap<String, Constructor<dyn GroupModel>>,
    throttles: HashMap<String, Constructor<dyn ThrottleModel>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_user("User", || Box::new(DefaultUserModel::default()));
        registry.register_group("Group", || Box::new(DefaultGroupModel::default()));
        registry.register_throttle("Throttle", || Box::new(DefaultThrottleModel::default()));
        registry
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .field("groups", &self.groups.keys().collect::<Vec<_>>())
            .field("throttles", &self.throttles.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModelRegistry {
    /// A registry without the built-in models
    pub fn empty() -> Self {
        Self {
            users: HashMap::new(),
            groups: HashMap::new(),
            throttles: HashMap::new(),
        }
    }

    pub fn register_user<F>(&mut self, name: &str, constructor: F) -> &mut Self
    where
        F: Fn() -> Box<dyn UserModel> + Send + Sync + 'static,
    {
        self.users.insert(name.to_string(), Arc::new(constructor));
        self
    }

    pub fn register_group<F>(&mut self, name: &str, constructor: F) -> &mut Self
    where
        F: Fn() -> Box<dyn GroupModel> + Send + Sync + 'static,
    {
        self.groups.insert(name.to_string(), Arc::new(constructor));
        self
    }

    pub fn register_throttle<F>(&mut self, name: &str, constructor: F) -> &mut Self
    where
        F: Fn() -> Box<dyn ThrottleModel> + Send + Sync + 'static,
    {
        self.throttles.insert(name.to_string(), Arc::new(constructor));
        self
    }

    pub fn user_model(&self, name: &str) -> Result<Box<dyn UserModel>, ConfigurationError> {
        lookup(&self.users, "user", name)
    }

    pub fn group_model(&self, name: &str) -> Result<Box<dyn GroupModel>, ConfigurationError> {
        lookup(&self.groups, "group", name)
    }

    pub fn throttle_model(&self, name: &str) -> Result<Box<dyn ThrottleModel>, ConfigurationError> {
        lookup(&self.throttles, "throttle", name)
    }
}

fn lookup<T: ?Sized>(
    table: &HashMap<String, Constructor<T>>,
    kind: &'static str,
    name: &str,
) -> Result<Box<T>, ConfigurationError> {
    table
        .get(name)
        .map(|constructor| constructor())
        .ok_or_else(|| ConfigurationError::UnknownModel {
            kind,
            name: name.to_string(),
        })
}
