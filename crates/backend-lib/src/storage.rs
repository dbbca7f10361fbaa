// ============================
// slax-backend-lib/src/storage.rs
// ============================
//! Storage abstraction with an in-memory implementation.
//!
//! This is the boundary where an ORM would plug in. Providers only talk to
//! [`Storage`]; [`MemoryStorage`] keeps every table in `DashMap`s.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

use dashmap::DashMap;
use parking_lot::Mutex;
use slax_common::RecordId;

/// Permission name to grant (`true`) or explicit deny (`false`)
pub type Permissions = BTreeMap<String, bool>;

/// A stored user row
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: RecordId,
    /// Login-capable attributes such as `email` or `username`
    pub attributes: BTreeMap<String, String>,
    pub password_hash: String,
    pub activated: bool,
    pub permissions: Permissions,
    pub last_login: Option<SystemTime>,
    pub created_at: SystemTime,
}

impl User {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A stored group row
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: RecordId,
    pub name: String,
    pub permissions: Permissions,
}

/// Failed-login bookkeeping for one user, optionally per client IP
#[derive(Debug, Clone, PartialEq)]
pub struct Throttle {
    pub user_id: RecordId,
    pub ip_address: Option<IpAddr>,
    pub attempts: u32,
    pub suspended: bool,
    pub banned: bool,
    pub last_attempt_at: Option<Instant>,
    pub suspended_at: Option<Instant>,
}

impl Throttle {
    pub fn new(user_id: RecordId, ip_address: Option<IpAddr>) -> Self {
        Self {
            user_id,
            ip_address,
            attempts: 0,
            suspended: false,
            banned: false,
            last_attempt_at: None,
            suspended_at: None,
        }
    }
}

/// Trait for storage backends
pub trait Storage: Send + Sync + fmt::Debug {
    /// Insert a user unless another user already holds the same value for
    /// `unique_attribute`. The id field of `user` is replaced.
    fn insert_user(&self, user: User, unique_attribute: &str) -> Option<User>;

    fn update_user(&self, user: &User);

    fn user(&self, id: RecordId) -> Option<User>;

    fn find_user_by_attribute(&self, attribute: &str, value: &str) -> Option<User>;

    /// Insert a group unless the name is taken
    fn insert_group(&self, name: &str, permissions: Permissions) -> Option<Group>;

    fn group(&self, id: RecordId) -> Option<Group>;

    fn find_group_by_name(&self, name: &str) -> Option<Group>;

    /// All groups ordered by id
    fn groups(&self) -> Vec<Group>;

    /// Link a user to a group in the named pivot table
    fn attach(&self, pivot: &str, user_id: RecordId, group_id: RecordId) -> bool;

    fn detach(&self, pivot: &str, user_id: RecordId, group_id: RecordId) -> bool;

    /// Group ids linked to a user in the named pivot table, ascending
    fn group_ids(&self, pivot: &str, user_id: RecordId) -> Vec<RecordId>;

    fn throttle(&self, user_id: RecordId, ip_address: Option<IpAddr>) -> Option<Throttle>;

    /// Apply `update` to the throttle row for `(user_id, ip_address)` and
    /// return the result, creating the row first when none exists. No other
    /// write to the same row may interleave with `update`.
    fn update_throttle(
        &self,
        user_id: RecordId,
        ip_address: Option<IpAddr>,
        update: &mut dyn FnMut(&mut Throttle),
    ) -> Throttle;
}

/// In-memory implementation of the Storage trait
#[derive(Debug, Default)]
pub struct MemoryStorage {
    next_id: AtomicU64,
    users: DashMap<RecordId, User>,
    groups: DashMap<RecordId, Group>,
    pivots: DashMap<(String, RecordId), BTreeSet<RecordId>>,
    throttles: DashMap<(RecordId, Option<IpAddr>), Throttle>,
    // serialises the uniqueness check with the insert
    write_lock: Mutex<()>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> RecordId {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Storage for MemoryStorage {
    fn insert_user(&self, mut user: User, unique_attribute: &str) -> Option<User> {
        let _guard = self.write_lock.lock();
        if let Some(value) = user.attribute(unique_attribute) {
            if self.find_user_by_attribute(unique_attribute, value).is_some() {
                return None;
            }
        }
        user.id = self.next_id();
        self.users.insert(user.id, user.clone());
        Some(user)
    }

    fn update_user(&self, user: &User) {
        self.users.insert(user.id, user.clone());
    }

    fn user(&self, id: RecordId) -> Option<User> {
        self.users.get(&id).map(|entry| entry.value().clone())
    }

    fn find_user_by_attribute(&self, attribute: &str, value: &str) -> Option<User> {
        self.users
            .iter()
            .find(|entry| entry.value().attribute(attribute) == Some(value))
            .map(|entry| entry.value().clone())
    }

    fn insert_group(&self, name: &str, permissions: Permissions) -> Option<Group> {
        let _guard = self.write_lock.lock();
        if self.find_group_by_name(name).is_some() {
            return None;
        }
        let group = Group {
            id: self.next_id(),
            name: name.to_string(),
            permissions,
        };
        self.groups.insert(group.id, group.clone());
        Some(group)
    }

    fn group(&self, id: RecordId) -> Option<Group> {
        self.groups.get(&id).map(|entry| entry.value().clone())
    }

    fn find_group_by_name(&self, name: &str) -> Option<Group> {
        self.groups
            .iter()
            .find(|entry| entry.value().name == name)
            .map(|entry| entry.value().clone())
    }

    fn groups(&self) -> Vec<Group> {
        let mut groups: Vec<Group> = self.groups.iter().map(|e| e.value().clone()).collect();
        groups.sort_by_key(|group| group.id);
        groups
    }

    fn attach(&self, pivot: &str, user_id: RecordId, group_id: RecordId) -> bool {
        self.pivots
            .entry((pivot.to_string(), user_id))
            .or_default()
            .insert(group_id)
    }

    fn detach(&self, pivot: &str, user_id: RecordId, group_id: RecordId) -> bool {
        self.pivots
            .get_mut(&(pivot.to_string(), user_id))
            .map(|mut ids| ids.remove(&group_id))
            .unwrap_or(false)
    }

    fn group_ids(&self, pivot: &str, user_id: RecordId) -> Vec<RecordId> {
        self.pivots
            .get(&(pivot.to_string(), user_id))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn throttle(&self, user_id: RecordId, ip_address: Option<IpAddr>) -> Option<Throttle> {
        self.throttles
            .get(&(user_id, ip_address))
            .map(|entry| entry.value().clone())
    }

    fn update_throttle(
        &self,
        user_id: RecordId,
        ip_address: Option<IpAddr>,
        update: &mut dyn FnMut(&mut Throttle),
    ) -> Throttle {
        // the entry guard holds the shard lock until the row is cloned out
        let mut row = self
            .throttles
            .entry((user_id, ip_address))
            .or_insert_with(|| Throttle::new(user_id, ip_address));
        update(row.value_mut());
        row.value().clone()
    }
}
