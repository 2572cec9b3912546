use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for group documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Self-reported rating on the closed `-2..=2` scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AffinityScore(i8);

impl AffinityScore {
    pub const MIN: i8 = -2;
    pub const MAX: i8 = 2;

    pub fn new(value: i64) -> Result<Self, InvalidScore> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as i8))
        } else {
            Err(InvalidScore(value))
        }
    }

    pub fn value(self) -> i8 {
        self.0
    }
}

impl TryFrom<i64> for AffinityScore {
    type Error = InvalidScore;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AffinityScore> for i64 {
    fn from(score: AffinityScore) -> Self {
        i64::from(score.0)
    }
}

/// Raised when an answer falls outside the rating scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("score {0} is outside the -2..=2 rating scale")]
pub struct InvalidScore(pub i64);

/// Word to rating map for one category of a profile.
pub type AffinityMap = BTreeMap<String, AffinityScore>;

/// Trim and lowercase a topic word, rejecting blanks.
pub fn normalize_word(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Category a topic word is rated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKind {
    Interest,
    Value,
}

impl TopicKind {
    pub fn label(self) -> &'static str {
        match self {
            TopicKind::Interest => "interest",
            TopicKind::Value => "value",
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single rateable word tagged with its category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    pub word: String,
    pub kind: TopicKind,
}

impl Topic {
    pub fn new(word: impl Into<String>, kind: TopicKind) -> Self {
        Self {
            word: word.into(),
            kind,
        }
    }

    pub fn interest(word: impl Into<String>) -> Self {
        Self::new(word, TopicKind::Interest)
    }

    pub fn value(word: impl Into<String>) -> Self {
        Self::new(word, TopicKind::Value)
    }
}

/// Matching-relevant slice of a member's profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub interests: AffinityMap,
    #[serde(default)]
    pub values: AffinityMap,
    /// Reveal history, oldest first.
    #[serde(default)]
    pub current_matches: Vec<UserId>,
    #[serde(default)]
    pub match_progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_group: Option<GroupId>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            interests: AffinityMap::new(),
            values: AffinityMap::new(),
            current_matches: Vec::new(),
            match_progress: 0,
            active_group: None,
        }
    }

    pub fn with_interest(mut self, word: &str, score: i8) -> Self {
        self.rate(TopicKind::Interest, word, score);
        self
    }

    pub fn with_value(mut self, word: &str, score: i8) -> Self {
        self.rate(TopicKind::Value, word, score);
        self
    }

    fn rate(&mut self, kind: TopicKind, word: &str, score: i8) {
        if let (Some(word), Ok(score)) = (normalize_word(word), AffinityScore::new(score.into())) {
            self.affinities_mut(kind).insert(word, score);
        }
    }

    pub fn affinities(&self, kind: TopicKind) -> &AffinityMap {
        match kind {
            TopicKind::Interest => &self.interests,
            TopicKind::Value => &self.values,
        }
    }

    fn affinities_mut(&mut self, kind: TopicKind) -> &mut AffinityMap {
        match kind {
            TopicKind::Interest => &mut self.interests,
            TopicKind::Value => &mut self.values,
        }
    }

    /// Category the word is already rated under, if any.
    pub fn rated_kind(&self, word: &str) -> Option<TopicKind> {
        if self.interests.contains_key(word) {
            Some(TopicKind::Interest)
        } else if self.values.contains_key(word) {
            Some(TopicKind::Value)
        } else {
            None
        }
    }

    pub fn has_rated(&self, word: &str) -> bool {
        self.rated_kind(word).is_some()
    }

    pub fn has_matched(&self, other: &UserId) -> bool {
        self.current_matches.contains(other)
    }

    /// Interests and values folded into one map; a value overrides an interest on key collision.
    pub fn merged_affinities(&self) -> BTreeMap<&str, i8> {
        self.interests
            .iter()
            .chain(self.values.iter())
            .map(|(word, score)| (word.as_str(), score.value()))
            .collect()
    }
}

/// Group document: a bounded roster of users eligible to match one another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    #[serde(default)]
    pub name: String,
    /// Enumeration order is preserved; ranking ties resolve by it.
    #[serde(default)]
    pub members: Vec<UserId>,
}

impl GroupRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: GroupId(id.into()),
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Array-union insert. Returns `false` when the user was already a member.
    pub fn add_member(&mut self, user: UserId) -> bool {
        if self.members.contains(&user) {
            false
        } else {
            self.members.push(user);
            true
        }
    }
}

/// Merge-patch write against a profile document.
///
/// Map entries overwrite per key and leave other keys untouched, `match_progress` and
/// `active_group` replace, and `append_matches` is an array-union so replays are harmless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "AffinityMap::is_empty")]
    pub interests: AffinityMap,
    #[serde(default, skip_serializing_if = "AffinityMap::is_empty")]
    pub values: AffinityMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append_matches: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_group: Option<GroupId>,
}

impl ProfilePatch {
    pub fn answer(topic: &Topic, score: AffinityScore) -> Self {
        let mut patch = Self::default();
        let map = match topic.kind {
            TopicKind::Interest => &mut patch.interests,
            TopicKind::Value => &mut patch.values,
        };
        map.insert(topic.word.clone(), score);
        patch
    }

    pub fn append_match(user: UserId) -> Self {
        Self {
            append_matches: vec![user],
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.match_progress = Some(progress);
        self
    }

    pub fn with_active_group(mut self, group: GroupId) -> Self {
        self.active_group = Some(group);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(&self, profile: &mut UserProfile) {
        profile
            .interests
            .extend(self.interests.iter().map(|(k, v)| (k.clone(), *v)));
        profile
            .values
            .extend(self.values.iter().map(|(k, v)| (k.clone(), *v)));
        if let Some(progress) = self.match_progress {
            profile.match_progress = progress;
        }
        for user in &self.append_matches {
            if !profile.has_matched(user) {
                profile.current_matches.push(user.clone());
            }
        }
        if let Some(group) = &self.active_group {
            profile.active_group = Some(group.clone());
        }
    }
}
