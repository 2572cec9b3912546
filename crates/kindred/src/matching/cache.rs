use super::domain::{GroupId, GroupRecord, UserProfile};
use super::repository::{ProfileStore, StoreError};

#[derive(Debug)]
struct CachedMembers {
    group_id: GroupId,
    profiles: Vec<UserProfile>,
}

/// Single-slot memo of the current group and its members for one session.
///
/// Entries load lazily and live until [`LookupCache::clear`] is called. Asking for a
/// different group replaces the slot.
#[derive(Debug, Default)]
pub struct LookupCache {
    group: Option<GroupRecord>,
    members: Option<CachedMembers>,
}

impl LookupCache {
    pub fn group<S>(&mut self, store: &S, id: &GroupId) -> Result<&GroupRecord, StoreError>
    where
        S: ProfileStore + ?Sized,
    {
        let group = match self.group.take() {
            Some(group) if &group.id == id => group,
            _ => store.get_group(id)?,
        };
        Ok(self.group.insert(group))
    }

    pub fn members<S>(&mut self, store: &S, id: &GroupId) -> Result<&[UserProfile], StoreError>
    where
        S: ProfileStore + ?Sized,
    {
        let cached = match self.members.take() {
            Some(cached) if &cached.group_id == id => cached,
            _ => CachedMembers {
                group_id: id.clone(),
                profiles: store.get_members(id)?,
            },
        };
        Ok(&self.members.insert(cached).profiles)
    }

    pub fn is_warm(&self) -> bool {
        self.group.is_some() || self.members.is_some()
    }

    pub fn clear(&mut self) {
        self.group = None;
        self.members = None;
    }
}
