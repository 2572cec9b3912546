//! Group affinity matching: scoring, ranking, survey questions, and match reveals.

pub mod cache;
pub mod domain;
pub mod progress;
pub mod questions;
pub mod ranking;
pub mod repository;
pub mod roster;
pub mod router;
pub mod scoring;
pub mod service;
pub mod topics;

#[cfg(test)]
mod tests;

pub use cache::LookupCache;
pub use domain::{
    normalize_word, AffinityMap, AffinityScore, GroupId, GroupRecord, InvalidScore, ProfilePatch,
    Topic, TopicKind, UserId, UserProfile,
};
pub use progress::{MatchProgress, ProgressMachine, ProgressState, RevealStep};
pub use questions::QuestionDispenser;
pub use ranking::{next_candidate, rank, CompatibilityResult};
pub use repository::{ProfileStore, StoreEntity, StoreError};
pub use roster::{load_roster, member_ids, parse_roster, RosterImportError};
pub use router::matching_router;
pub use scoring::{common_affinities, score, Compatibility, GAP_WEIGHT, KEY_WEIGHT};
pub use service::{AnswerOutcome, MatchError, MatchingService, RevealOutcome, RevealedMatch};
pub use topics::{TopicPool, DEFAULT_FALLBACK_INTERESTS};
