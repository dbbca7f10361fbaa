//! Group lookup and creation on top of a configured group model.
use std::sync::Arc;

use slax_common::RecordId;
use tracing::debug;

use crate::error::AuthError;
use crate::model::GroupModel;
use crate::storage::{Group, Permissions, Storage};

#[derive(Debug)]
pub struct GroupProvider {
    model: Box<dyn GroupModel>,
    storage: Arc<dyn Storage>,
}

impl GroupProvider {
    pub fn new(model: Box<dyn GroupModel>, storage: Arc<dyn Storage>) -> Self {
        Self { model, storage }
    }

    pub fn model(&self) -> &dyn GroupModel {
        self.model.as_ref()
    }

    pub fn create(&self, name: &str, permissions: Permissions) -> Result<Group, AuthError> {
        let group = self
            .storage
            .insert_group(name, permissions)
            .ok_or_else(|| AuthError::GroupExists(name.to_string()))?;
        debug!(group_id = group.id, name, "group created");
        Ok(group)
    }

    pub fn find_by_id(&self, id: RecordId) -> Result<Group, AuthError> {
        self.storage.group(id).ok_or(AuthError::GroupNotFound)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Group, AuthError> {
        self.storage
            .find_group_by_name(name)
            .ok_or(AuthError::GroupNotFound)
    }

    pub fn find_all(&self) -> Vec<Group> {
        self.storage.groups()
    }

    /// Groups a user belongs to according to this model's pivot table
    pub fn groups_of(&self, user_id: RecordId) -> Vec<Group> {
        self.storage
            .group_ids(self.model.user_groups_pivot(), user_id)
            .into_iter()
            .filter_map(|id| self.storage.group(id))
            .collect()
    }
}
