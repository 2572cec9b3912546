use std::collections::HashSet;

use super::domain::{Topic, TopicKind, UserProfile};

/// Interests offered once a group's own vocabulary has been exhausted.
pub const DEFAULT_FALLBACK_INTERESTS: &[&str] = &[
    "hiking",
    "cooking",
    "board games",
    "photography",
    "gardening",
    "cycling",
    "painting",
    "reading",
    "camping",
    "yoga",
    "rock climbing",
    "baking",
    "chess",
    "podcasts",
    "running",
    "knitting",
    "video games",
    "birdwatching",
    "swimming",
    "live music",
    "theatre",
    "travel",
    "fishing",
    "skiing",
    "woodworking",
    "dancing",
    "astronomy",
    "poetry",
    "karaoke",
    "volunteering",
];

/// De-duplicated set of topics drawn from a group's profiles.
///
/// Insertion order is kept. A word keeps the kind it was first seen with even if another
/// member rated it under the other category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicPool {
    topics: Vec<Topic>,
    words: HashSet<String>,
}

impl TopicPool {
    /// Union of every member's values then interests.
    pub fn build(members: &[UserProfile]) -> Self {
        let mut pool = Self::default();
        for member in members {
            for kind in [TopicKind::Value, TopicKind::Interest] {
                for word in member.affinities(kind).keys() {
                    pool.insert(Topic::new(word.clone(), kind));
                }
            }
        }
        pool
    }

    /// Returns `false` if the word was already present.
    pub fn insert(&mut self, topic: Topic) -> bool {
        if self.words.insert(topic.word.clone()) {
            self.topics.push(topic);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn kind_of(&self, word: &str) -> Option<TopicKind> {
        self.topics
            .iter()
            .find(|topic| topic.word == word)
            .map(|topic| topic.kind)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter()
    }

    /// Topics the given profile has rated under neither category.
    pub fn unanswered_by<'a>(&'a self, profile: &'a UserProfile) -> impl Iterator<Item = &'a Topic> {
        self.topics
            .iter()
            .filter(move |topic| !profile.has_rated(&topic.word))
    }
}
