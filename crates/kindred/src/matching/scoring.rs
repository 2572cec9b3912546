use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Topic, TopicKind, UserProfile};

/// Weight each key of the scoring side adds to the denominator.
pub const KEY_WEIGHT: i32 = 4;
/// Difference charged when the other side never rated a key.
pub const MISSING_KEY_PENALTY: i32 = 2;
/// Difference charged per notch of rating gap on a shared key.
pub const GAP_WEIGHT: i32 = 1;
/// Minimum rating both users need for a topic to count as shared.
pub const COMMON_AFFINITY_MIN: i8 = 2;

/// Similarity of one profile measured against another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Compatibility {
    pub percent: f64,
    /// `false` once any key on the scoring side is missing from the other side.
    pub full_overlap: bool,
}

/// Score `subject` against `other`.
///
/// Keys are enumerated from `subject` only, so the result is directional. A shared key costs
/// its rating gap and a missing key costs [`MISSING_KEY_PENALTY`], so the percentage falls
/// strictly as ratings drift apart and stays within `0..=100` without clamping.
pub fn score(subject: &UserProfile, other: &UserProfile) -> Compatibility {
    score_affinities(&subject.merged_affinities(), &other.merged_affinities())
}

pub fn score_affinities(subject: &BTreeMap<&str, i8>, other: &BTreeMap<&str, i8>) -> Compatibility {
    let mut full_overlap = true;
    let mut difference: i32 = 0;
    let mut max: i32 = 0;

    for (word, score) in subject {
        max += KEY_WEIGHT;
        match other.get(word) {
            Some(theirs) => {
                let gap = (i32::from(*score) - i32::from(*theirs)).abs();
                difference += gap * GAP_WEIGHT;
            }
            None => {
                difference += MISSING_KEY_PENALTY;
                full_overlap = false;
            }
        }
    }

    if max == 0 {
        return Compatibility {
            percent: 100.0,
            full_overlap: true,
        };
    }

    Compatibility {
        percent: 100.0 - (f64::from(difference) / f64::from(max)) * 100.0,
        full_overlap,
    }
}

/// Topics both users rated at or above `min_score`, interests first, then values.
pub fn common_affinities(subject: &UserProfile, other: &UserProfile, min_score: i8) -> Vec<Topic> {
    let mut common = Vec::new();
    for kind in [TopicKind::Interest, TopicKind::Value] {
        let mine = subject.affinities(kind);
        for (word, theirs) in other.affinities(kind) {
            let shared = mine
                .get(word)
                .is_some_and(|score| score.value() >= min_score && theirs.value() >= min_score);
            if shared {
                common.push(Topic::new(word.clone(), kind));
            }
        }
    }
    common
}
