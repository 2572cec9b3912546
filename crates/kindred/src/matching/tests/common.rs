use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::MatchingConfig;
use crate::matching::domain::{GroupId, GroupRecord, ProfilePatch, UserId, UserProfile};
use crate::matching::repository::{ProfileStore, StoreError};
use crate::matching::{matching_router, MatchingService};

pub(super) fn uid(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn group_id() -> GroupId {
    GroupId("g1".to_string())
}

pub(super) fn matching_config() -> MatchingConfig {
    MatchingConfig {
        rng_seed: Some(7),
        ..MatchingConfig::default()
    }
}

/// `me` has rated nothing yet; `u2` likes hiking; `u3` has an empty profile.
pub(super) fn survey_members() -> Vec<UserProfile> {
    vec![
        UserProfile::new("me"),
        UserProfile::new("u2").with_interest("hiking", 2),
        UserProfile::new("u3"),
    ]
}

pub(super) fn build_service(
    members: Vec<UserProfile>,
) -> (MatchingService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_group("g1", members));
    let service = MatchingService::new(store.clone(), matching_config());
    (service, store)
}

#[derive(Default)]
pub(super) struct MemoryStore {
    profiles: Mutex<HashMap<UserId, UserProfile>>,
    groups: Mutex<HashMap<GroupId, GroupRecord>>,
    member_reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub(super) fn with_group(id: &str, members: Vec<UserProfile>) -> Self {
        let store = Self::default();
        let mut group = GroupRecord::new(id, "Test group");
        for mut profile in members {
            group.add_member(profile.id.clone());
            profile.active_group = Some(group.id.clone());
            store.insert_profile(profile);
        }
        store
            .groups
            .lock()
            .expect("group mutex poisoned")
            .insert(group.id.clone(), group);
        store
    }

    pub(super) fn insert_profile(&self, profile: UserProfile) {
        self.profiles
            .lock()
            .expect("profile mutex poisoned")
            .insert(profile.id.clone(), profile);
    }

    pub(super) fn profile(&self, id: &str) -> UserProfile {
        self.profiles
            .lock()
            .expect("profile mutex poisoned")
            .get(&uid(id))
            .cloned()
            .expect("profile present")
    }

    pub(super) fn member_reads(&self) -> usize {
        self.member_reads.load(Ordering::SeqCst)
    }

    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ProfileStore for MemoryStore {
    fn get_profile(&self, id: &UserId) -> Result<UserProfile, StoreError> {
        self.profiles
            .lock()
            .expect("profile mutex poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::profile_not_found(id))
    }

    fn get_group(&self, id: &GroupId) -> Result<GroupRecord, StoreError> {
        self.groups
            .lock()
            .expect("group mutex poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::group_not_found(id))
    }

    fn get_members(&self, id: &GroupId) -> Result<Vec<UserProfile>, StoreError> {
        self.member_reads.fetch_add(1, Ordering::SeqCst);
        let group = self.get_group(id)?;
        let profiles = self.profiles.lock().expect("profile mutex poisoned");
        Ok(group
            .members
            .iter()
            .filter_map(|member| profiles.get(member).cloned())
            .collect())
    }

    fn update_profile(&self, id: &UserId, patch: ProfilePatch) -> Result<UserProfile, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut profiles = self.profiles.lock().expect("profile mutex poisoned");
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| StoreError::profile_not_found(id))?;
        patch.apply(profile);
        Ok(profile.clone())
    }

    fn create_group(&self, group: GroupRecord) -> Result<GroupRecord, StoreError> {
        let mut groups = self.groups.lock().expect("group mutex poisoned");
        if groups.contains_key(&group.id) {
            return Err(StoreError::group_exists(&group.id));
        }
        groups.insert(group.id.clone(), group.clone());
        Ok(group)
    }

    fn add_member(&self, group: &GroupId, user: &UserId) -> Result<GroupRecord, StoreError> {
        let mut groups = self.groups.lock().expect("group mutex poisoned");
        let record = groups
            .get_mut(group)
            .ok_or_else(|| StoreError::group_not_found(group))?;
        let mut profiles = self.profiles.lock().expect("profile mutex poisoned");
        let profile = profiles
            .get_mut(user)
            .ok_or_else(|| StoreError::profile_not_found(user))?;
        record.add_member(user.clone());
        ProfilePatch::default()
            .with_active_group(group.clone())
            .apply(profile);
        Ok(record.clone())
    }
}

/// Serves reads from an inner store but rejects every write.
pub(super) struct ReadOnlyStore(pub(super) MemoryStore);

impl ProfileStore for ReadOnlyStore {
    fn get_profile(&self, id: &UserId) -> Result<UserProfile, StoreError> {
        self.0.get_profile(id)
    }

    fn get_group(&self, id: &GroupId) -> Result<GroupRecord, StoreError> {
        self.0.get_group(id)
    }

    fn get_members(&self, id: &GroupId) -> Result<Vec<UserProfile>, StoreError> {
        self.0.get_members(id)
    }

    fn update_profile(&self, _id: &UserId, _patch: ProfilePatch) -> Result<UserProfile, StoreError> {
        Err(StoreError::WriteRejected("read only".to_string()))
    }

    fn create_group(&self, _group: GroupRecord) -> Result<GroupRecord, StoreError> {
        Err(StoreError::WriteRejected("read only".to_string()))
    }

    fn add_member(&self, _group: &GroupId, _user: &UserId) -> Result<GroupRecord, StoreError> {
        Err(StoreError::WriteRejected("read only".to_string()))
    }
}

/// Accepts a fixed budget of profile writes, then rejects the rest.
pub(super) struct WriteBudgetStore {
    pub(super) inner: MemoryStore,
    remaining: AtomicUsize,
}

impl WriteBudgetStore {
    pub(super) fn new(inner: MemoryStore, budget: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(budget),
        }
    }

    pub(super) fn allow_writes(&self, budget: usize) {
        self.remaining.store(budget, Ordering::SeqCst);
    }
}

impl ProfileStore for WriteBudgetStore {
    fn get_profile(&self, id: &UserId) -> Result<UserProfile, StoreError> {
        self.inner.get_profile(id)
    }

    fn get_group(&self, id: &GroupId) -> Result<GroupRecord, StoreError> {
        self.inner.get_group(id)
    }

    fn get_members(&self, id: &GroupId) -> Result<Vec<UserProfile>, StoreError> {
        self.inner.get_members(id)
    }

    fn update_profile(&self, id: &UserId, patch: ProfilePatch) -> Result<UserProfile, StoreError> {
        let granted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !granted {
            return Err(StoreError::WriteRejected("write budget spent".to_string()));
        }
        self.inner.update_profile(id, patch)
    }

    fn create_group(&self, group: GroupRecord) -> Result<GroupRecord, StoreError> {
        self.inner.create_group(group)
    }

    fn add_member(&self, group: &GroupId, user: &UserId) -> Result<GroupRecord, StoreError> {
        self.inner.add_member(group, user)
    }
}

pub(super) struct UnavailableStore;

impl ProfileStore for UnavailableStore {
    fn get_profile(&self, _id: &UserId) -> Result<UserProfile, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn get_group(&self, _id: &GroupId) -> Result<GroupRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn get_members(&self, _id: &GroupId) -> Result<Vec<UserProfile>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update_profile(&self, _id: &UserId, _patch: ProfilePatch) -> Result<UserProfile, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn create_group(&self, _group: GroupRecord) -> Result<GroupRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn add_member(&self, _group: &GroupId, _user: &UserId) -> Result<GroupRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_with_service(service: MatchingService<MemoryStore>) -> axum::Router {
    matching_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
