use kindred::matching::{
    GroupId, GroupRecord, ProfilePatch, ProfileStore, StoreError, UserId, UserProfile,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct Documents {
    profiles: HashMap<UserId, UserProfile>,
    groups: HashMap<GroupId, GroupRecord>,
}

/// Process-local document store. One lock covers both collections so a join updates the
/// group and the profile together.
#[derive(Default, Clone)]
pub(crate) struct InMemoryProfileStore {
    documents: Arc<Mutex<Documents>>,
}

impl InMemoryProfileStore {
    fn documents(&self) -> Result<MutexGuard<'_, Documents>, StoreError> {
        self.documents
            .lock()
            .map_err(|_| StoreError::Unavailable("document mutex poisoned".to_string()))
    }

    /// Create a group holding every given profile, in order.
    pub(crate) fn seed(
        &self,
        group_id: &str,
        name: &str,
        profiles: Vec<UserProfile>,
    ) -> Result<GroupRecord, StoreError> {
        let mut documents = self.documents()?;
        let mut group = GroupRecord::new(group_id, name);
        for mut profile in profiles {
            group.add_member(profile.id.clone());
            profile.active_group = Some(group.id.clone());
            documents.profiles.insert(profile.id.clone(), profile);
        }
        documents.groups.insert(group.id.clone(), group.clone());
        Ok(group)
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get_profile(&self, id: &UserId) -> Result<UserProfile, StoreError> {
        self.documents()?
            .profiles
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::profile_not_found(id))
    }

    fn get_group(&self, id: &GroupId) -> Result<GroupRecord, StoreError> {
        self.documents()?
            .groups
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::group_not_found(id))
    }

    fn get_members(&self, id: &GroupId) -> Result<Vec<UserProfile>, StoreError> {
        let documents = self.documents()?;
        let group = documents
            .groups
            .get(id)
            .ok_or_else(|| StoreError::group_not_found(id))?;
        Ok(group
            .members
            .iter()
            .filter_map(|member| documents.profiles.get(member).cloned())
            .collect())
    }

    fn update_profile(&self, id: &UserId, patch: ProfilePatch) -> Result<UserProfile, StoreError> {
        let mut documents = self.documents()?;
        let profile = documents
            .profiles
            .get_mut(id)
            .ok_or_else(|| StoreError::profile_not_found(id))?;
        patch.apply(profile);
        Ok(profile.clone())
    }

    fn create_group(&self, group: GroupRecord) -> Result<GroupRecord, StoreError> {
        let mut documents = self.documents()?;
        if documents.groups.contains_key(&group.id) {
            return Err(StoreError::group_exists(&group.id));
        }
        documents.groups.insert(group.id.clone(), group.clone());
        Ok(group)
    }

    fn add_member(&self, group: &GroupId, user: &UserId) -> Result<GroupRecord, StoreError> {
        let mut documents = self.documents()?;
        let Documents { profiles, groups } = &mut *documents;
        let profile = profiles
            .get_mut(user)
            .ok_or_else(|| StoreError::profile_not_found(user))?;
        let record = groups
            .get_mut(group)
            .ok_or_else(|| StoreError::group_not_found(group))?;
        record.add_member(user.clone());
        ProfilePatch::default()
            .with_active_group(group.clone())
            .apply(profile);
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> InMemoryProfileStore {
        let store = InMemoryProfileStore::default();
        store
            .seed(
                "g1",
                "Climbing crew",
                vec![
                    UserProfile::new("ana").with_interest("climbing", 2),
                    UserProfile::new("ben"),
                ],
            )
            .expect("seed succeeds");
        store
    }

    #[test]
    fn seed_registers_members_in_order() {
        let store = seeded();
        let members = store
            .get_members(&GroupId("g1".to_string()))
            .expect("members load");
        let ids: Vec<&str> = members.iter().map(|profile| profile.id.0.as_str()).collect();
        assert_eq!(ids, vec!["ana", "ben"]);
        assert_eq!(members[0].active_group, Some(GroupId("g1".to_string())));
    }

    #[test]
    fn add_member_requires_an_existing_profile() {
        let store = seeded();
        match store.add_member(&GroupId("g1".to_string()), &UserId("ghost".to_string())) {
            Err(StoreError::NotFound { id, .. }) => assert_eq!(id, "ghost"),
            other => panic!("expected missing profile, got {other:?}"),
        }
        let group = store
            .get_group(&GroupId("g1".to_string()))
            .expect("group loads");
        assert_eq!(group.members.len(), 2);
    }

    #[test]
    fn create_group_rejects_taken_ids() {
        let store = seeded();
        match store.create_group(GroupRecord::new("g1", "Again")) {
            Err(StoreError::Conflict { id, .. }) => assert_eq!(id, "g1"),
            other => panic!("expected conflict, got {other:?}"),
        }
        let fresh = store
            .create_group(GroupRecord::new("g2", "Night owls"))
            .expect("new group");
        assert!(fresh.members.is_empty());
    }

    #[test]
    fn update_profile_merges_patches() {
        let store = seeded();
        let ana = UserId("ana".to_string());
        let patch = ProfilePatch::append_match(UserId("ben".to_string())).with_progress(0);
        store.update_profile(&ana, patch.clone()).expect("update");
        let updated = store.update_profile(&ana, patch).expect("replay");
        assert_eq!(updated.current_matches, vec![UserId("ben".to_string())]);
        assert_eq!(updated.interests.len(), 1);
    }
}
