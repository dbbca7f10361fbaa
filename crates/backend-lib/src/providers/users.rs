// ============================
// slax-backend-lib/src/providers/users.rs
// ============================
//! User lookup and creation on top of a configured user model.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use slax_common::RecordId;
use tracing::debug;

use crate::auth::{Credentials, Hasher};
use crate::error::AuthError;
use crate::model::UserModel;
use crate::storage::{Group, Permissions, Storage, User};

#[derive(Debug)]
pub struct UserProvider {
    hasher: Arc<dyn Hasher>,
    model: Box<dyn UserModel>,
    storage: Arc<dyn Storage>,
}

impl UserProvider {
    pub fn new(hasher: Arc<dyn Hasher>, model: Box<dyn UserModel>, storage: Arc<dyn Storage>) -> Self {
        Self {
            hasher,
            model,
            storage,
        }
    }

    pub fn hasher(&self) -> &dyn Hasher {
        self.hasher.as_ref()
    }

    pub fn model(&self) -> &dyn UserModel {
        self.model.as_ref()
    }

    /// Attribute matched against the login of incoming credentials
    pub fn login_attribute(&self) -> &str {
        self.model.login_attribute()
    }

    /// Create a user whose login attribute is the credentials' login
    pub fn create(&self, credentials: &Credentials, activated: bool) -> Result<User, AuthError> {
        let attributes = BTreeMap::from([(
            self.login_attribute().to_string(),
            credentials.login.clone(),
        )]);
        self.create_with_attributes(attributes, credentials.password(), activated)
    }

    /// Create a user from arbitrary attributes; the login attribute is required
    pub fn create_with_attributes(
        &self,
        attributes: BTreeMap<String, String>,
        password: &str,
        activated: bool,
    ) -> Result<User, AuthError> {
        match attributes.get(self.login_attribute()) {
            Some(login) if !login.trim().is_empty() => {},
            _ => return Err(AuthError::LoginRequired),
        }
        if password.is_empty() {
            return Err(AuthError::PasswordRequired);
        }

        let user = User {
            id: 0,
            attributes,
            password_hash: self.hasher.hash(password)?,
            activated,
            permissions: Permissions::new(),
            last_login: None,
            created_at: SystemTime::now(),
        };

        let user = self
            .storage
            .insert_user(user, self.login_attribute())
            .ok_or(AuthError::UserExists)?;
        debug!(user_id = user.id, "user created");
        Ok(user)
    }

    pub fn find_by_id(&self, id: RecordId) -> Result<User, AuthError> {
        self.storage.user(id).ok_or(AuthError::UserNotFound)
    }

    pub fn find_by_login(&self, login: &str) -> Result<User, AuthError> {
        self.storage
            .find_user_by_attribute(self.login_attribute(), login)
            .ok_or(AuthError::UserNotFound)
    }

    /// Find a user and verify the password with the configured hasher
    pub fn find_by_credentials(&self, credentials: &Credentials) -> Result<User, AuthError> {
        credentials.validate()?;
        let user = self.find_by_login(&credentials.login)?;
        if !self.hasher.check(credentials.password(), &user.password_hash) {
            return Err(AuthError::WrongPassword);
        }
        Ok(user)
    }

    pub fn record_login(&self, user: &mut User) {
        user.last_login = Some(SystemTime::now());
        self.storage.update_user(user);
    }

    pub fn activate(&self, id: RecordId) -> Result<User, AuthError> {
        let mut user = self.find_by_id(id)?;
        user.activated = true;
        self.storage.update_user(&user);
        Ok(user)
    }

    pub fn set_permissions(&self, id: RecordId, permissions: Permissions) -> Result<User, AuthError> {
        let mut user = self.find_by_id(id)?;
        user.permissions = permissions;
        self.storage.update_user(&user);
        Ok(user)
    }

    /// Link a user to a group through the model's pivot table
    pub fn add_group(&self, user_id: RecordId, group: &Group) -> bool {
        self.storage
            .attach(self.model.user_groups_pivot(), user_id, group.id)
    }

    pub fn remove_group(&self, user_id: RecordId, group: &Group) -> bool {
        self.storage
            .detach(self.model.user_groups_pivot(), user_id, group.id)
    }

    pub fn group_ids(&self, user_id: RecordId) -> Vec<RecordId> {
        self.storage.group_ids(self.model.user_groups_pivot(), user_id)
    }
}
