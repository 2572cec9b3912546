use std::fmt;

use super::domain::{GroupId, GroupRecord, ProfilePatch, UserId, UserProfile};

/// Document store the engine reads profiles and groups from and writes patches back to.
///
/// Implementations must apply a [`ProfilePatch`] atomically per user so concurrent
/// answers and reveals cannot drop each other's keys.
pub trait ProfileStore: Send + Sync {
    fn get_profile(&self, id: &UserId) -> Result<UserProfile, StoreError>;
    fn get_group(&self, id: &GroupId) -> Result<GroupRecord, StoreError>;
    /// Profiles of every member, in the group's enumeration order.
    fn get_members(&self, id: &GroupId) -> Result<Vec<UserProfile>, StoreError>;
    fn update_profile(&self, id: &UserId, patch: ProfilePatch) -> Result<UserProfile, StoreError>;
    /// Insert a new group document. Fails with [`StoreError::Conflict`] if the id is taken.
    fn create_group(&self, group: GroupRecord) -> Result<GroupRecord, StoreError>;
    /// Array-union the user into the group and make it their active group.
    fn add_member(&self, group: &GroupId, user: &UserId) -> Result<GroupRecord, StoreError>;
}

/// Document collection a lookup was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEntity {
    Profile,
    Group,
}

impl fmt::Display for StoreEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreEntity::Profile => f.write_str("profile"),
            StoreEntity::Group => f.write_str("group"),
        }
    }
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: StoreEntity, id: String },
    #[error("{entity} '{id}' already exists")]
    Conflict { entity: StoreEntity, id: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("write rejected: {0}")]
    WriteRejected(String),
}

impl StoreError {
    pub fn profile_not_found(id: &UserId) -> Self {
        Self::NotFound {
            entity: StoreEntity::Profile,
            id: id.0.clone(),
        }
    }

    pub fn group_not_found(id: &GroupId) -> Self {
        Self::NotFound {
            entity: StoreEntity::Group,
            id: id.0.clone(),
        }
    }

    pub fn group_exists(id: &GroupId) -> Self {
        Self::Conflict {
            entity: StoreEntity::Group,
            id: id.0.clone(),
        }
    }
}
