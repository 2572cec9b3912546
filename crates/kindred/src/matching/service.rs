use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::MatchingConfig;

use super::cache::LookupCache;
use super::domain::{
    normalize_word, AffinityScore, GroupId, GroupRecord, InvalidScore, ProfilePatch, Topic,
    TopicKind, UserId, UserProfile,
};
use super::progress::{MatchProgress, ProgressMachine, RevealStep};
use super::questions::QuestionDispenser;
use super::ranking::{next_candidate, rank, CompatibilityResult};
use super::repository::{ProfileStore, StoreEntity, StoreError};
use super::scoring::{common_affinities, COMMON_AFFINITY_MIN};
use super::topics::TopicPool;

/// A member surfaced by a reveal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealedMatch {
    pub user_id: UserId,
    pub percent: f64,
    pub full_overlap: bool,
    /// Progress after the reset that follows a reveal.
    pub progress: MatchProgress,
    pub revealed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RevealOutcome {
    Revealed(RevealedMatch),
    /// Every other member has already been revealed.
    NoCandidate,
    NotReady { progress: MatchProgress },
}

/// Result of recording one survey answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub topic: Topic,
    pub score: AffinityScore,
    /// Progress reached by this answer, before any reveal reset.
    pub progress: MatchProgress,
    pub questions_remaining: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<Topic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reveal: Option<RevealOutcome>,
}

/// Error raised by the matching service.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: StoreEntity, id: String },
    #[error(transparent)]
    InvalidScore(#[from] InvalidScore),
    #[error("topic word must not be empty")]
    EmptyTopic,
    #[error("'{word}' is already rated under {existing}")]
    KindConflict { word: String, existing: TopicKind },
    #[error("{entity} '{id}' already exists")]
    AlreadyExists { entity: StoreEntity, id: String },
    #[error("group name must not be empty")]
    EmptyGroupName,
    #[error("profile write failed: {0}")]
    StoreWriteFailure(#[source] StoreError),
    #[error("store read failed: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for MatchError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::Conflict { entity, id } => Self::AlreadyExists { entity, id },
            other => Self::Store(other),
        }
    }
}

fn write_failure(error: StoreError) -> MatchError {
    match error {
        StoreError::NotFound { entity, id } => MatchError::NotFound { entity, id },
        StoreError::Conflict { entity, id } => MatchError::AlreadyExists { entity, id },
        other => MatchError::StoreWriteFailure(other),
    }
}

static GROUP_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_group_id() -> GroupId {
    let id = GROUP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    GroupId(format!("group-{id:06}"))
}

/// Lookup cache and question queue belonging to one user's session.
#[derive(Debug)]
struct MatchSession {
    group_id: Option<GroupId>,
    cache: LookupCache,
    dispenser: QuestionDispenser<StdRng>,
    primed: bool,
}

impl MatchSession {
    fn open_group(&mut self, group_id: &GroupId) {
        if self.group_id.as_ref() != Some(group_id) {
            self.group_id = Some(group_id.clone());
            self.cache.clear();
            self.dispenser.reset();
            self.primed = false;
        }
    }

    fn invalidate(&mut self) {
        self.cache.clear();
        self.primed = false;
    }
}

/// Matching engine facade composing the store, scorer, dispenser, and reveal machine.
///
/// Each user gets a session guarded by its own mutex. Holding it for the whole of
/// `record_answer` and `try_reveal_match` serializes progress and match writes per user.
pub struct MatchingService<S> {
    store: Arc<S>,
    config: MatchingConfig,
    fallback: Arc<[String]>,
    sessions: Mutex<HashMap<UserId, Arc<Mutex<MatchSession>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S> MatchingService<S>
where
    S: ProfileStore + 'static,
{
    pub fn new(store: Arc<S>, config: MatchingConfig) -> Self {
        let fallback: Arc<[String]> = config.fallback_topics.clone().into();
        Self {
            store,
            config,
            fallback,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    fn session(&self, user_id: &UserId) -> Arc<Mutex<MatchSession>> {
        let mut sessions = lock(&self.sessions);
        let session = sessions.entry(user_id.clone()).or_insert_with(|| {
            let rng = match self.config.rng_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            Arc::new(Mutex::new(MatchSession {
                group_id: None,
                cache: LookupCache::default(),
                dispenser: QuestionDispenser::new(Arc::clone(&self.fallback), rng),
                primed: false,
            }))
        });
        Arc::clone(session)
    }

    /// Every other group member scored against the user, best first.
    pub fn compatibility_ranking(
        &self,
        user_id: &UserId,
        group_id: &GroupId,
    ) -> Result<Vec<CompatibilityResult>, MatchError> {
        let session = self.session(user_id);
        let mut session = lock(&session);
        session.open_group(group_id);

        let current = self.store.get_profile(user_id)?;
        let members = session.cache.members(self.store.as_ref(), group_id)?;
        Ok(rank(&current, members))
    }

    /// Best-ranked member not yet revealed to the user.
    pub fn next_match_candidate(
        &self,
        user_id: &UserId,
        group_id: &GroupId,
    ) -> Result<Option<UserId>, MatchError> {
        let session = self.session(user_id);
        let mut session = lock(&session);
        session.open_group(group_id);

        let current = self.store.get_profile(user_id)?;
        let members = session.cache.members(self.store.as_ref(), group_id)?;
        let ranking = rank(&current, members);
        Ok(next_candidate(&ranking, &current.current_matches).map(|entry| entry.other_user_id.clone()))
    }

    /// Union of the topics rated anywhere in the group.
    pub fn topic_pool(&self, user_id: &UserId, group_id: &GroupId) -> Result<TopicPool, MatchError> {
        let session = self.session(user_id);
        let mut session = lock(&session);
        session.open_group(group_id);

        let members = session.cache.members(self.store.as_ref(), group_id)?;
        Ok(TopicPool::build(members))
    }

    /// Questions currently shown to the user, topping the queue up to `count` slots.
    pub fn topic_queue_snapshot(
        &self,
        user_id: &UserId,
        group_id: &GroupId,
        count: Option<usize>,
    ) -> Result<Vec<Topic>, MatchError> {
        let depth = count.unwrap_or(self.config.queue_depth);
        let session = self.session(user_id);
        let mut session = lock(&session);
        session.open_group(group_id);

        let profile = self.store.get_profile(user_id)?;
        self.prime(&mut session, group_id, &profile)?;
        let shown = session.dispenser.fill_slots(depth, &profile);
        Ok(shown.iter().take(depth).cloned().collect())
    }

    fn prime(
        &self,
        session: &mut MatchSession,
        group_id: &GroupId,
        profile: &UserProfile,
    ) -> Result<(), MatchError> {
        if session.primed {
            return Ok(());
        }
        let members = session.cache.members(self.store.as_ref(), group_id)?;
        let pool = TopicPool::build(members);
        let queued = session.dispenser.enqueue_unanswered(&pool, profile);
        session.primed = true;
        debug!(user = %profile.id, group = %group_id, queued, "question queue primed");
        Ok(())
    }

    /// Persist one answer, advance progress, and reveal when the threshold is reached.
    ///
    /// The score, the topic and the group are all resolved before anything is written, and
    /// the answer and the new progress go out as a single merge patch. Once that patch is
    /// stored the call succeeds; a reveal that fails afterwards leaves progress at 100 and
    /// `reveal` empty, so `try_reveal_match` can finish it.
    pub fn record_answer(
        &self,
        user_id: &UserId,
        topic: Topic,
        score: i64,
    ) -> Result<AnswerOutcome, MatchError> {
        let score = AffinityScore::new(score)?;
        let word = normalize_word(&topic.word).ok_or(MatchError::EmptyTopic)?;
        let topic = Topic::new(word, topic.kind);

        let session = self.session(user_id);
        let mut session = lock(&session);

        let profile = self.store.get_profile(user_id)?;
        if let Some(existing) = profile.rated_kind(&topic.word) {
            if existing != topic.kind {
                return Err(MatchError::KindConflict {
                    word: topic.word,
                    existing,
                });
            }
        }

        let group_id = session.group_id.clone().or_else(|| profile.active_group.clone());
        if let Some(group_id) = &group_id {
            session.open_group(group_id);
            self.prime(&mut session, group_id, &profile)?;
            session.cache.members(self.store.as_ref(), group_id)?;
        }

        let mut machine = ProgressMachine::resume(profile.match_progress, self.config.question_increment);
        let progress = machine.record_answer();
        let patch = ProfilePatch::answer(&topic, score).with_progress(progress.value());
        let updated = self
            .store
            .update_profile(user_id, patch)
            .map_err(write_failure)?;

        // The answer is committed from here on; later failures must not surface as a failed answer.
        let retired = session.dispenser.retire(&topic.word);
        let next_question = match &group_id {
            Some(_) if retired || session.dispenser.outstanding().is_empty() => {
                session.dispenser.next_question(&updated)
            }
            _ => None,
        };

        let reveal = match &group_id {
            Some(group_id) if progress.is_complete() => {
                match self.reveal_locked(&mut session, &updated, group_id, machine) {
                    Ok(outcome) => Some(outcome),
                    Err(error) => {
                        warn!(user = %user_id, group = %group_id, %error, "reveal deferred; progress kept at threshold");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(AnswerOutcome {
            topic,
            score,
            progress,
            questions_remaining: progress.remaining_questions(self.config.question_increment),
            next_question,
            reveal,
        })
    }

    /// Reveal the next candidate if progress has reached the threshold.
    pub fn try_reveal_match(
        &self,
        user_id: &UserId,
        group_id: &GroupId,
    ) -> Result<RevealOutcome, MatchError> {
        let session = self.session(user_id);
        let mut session = lock(&session);
        session.open_group(group_id);

        let profile = self.store.get_profile(user_id)?;
        let machine = ProgressMachine::resume(profile.match_progress, self.config.question_increment);
        self.reveal_locked(&mut session, &profile, group_id, machine)
    }

    fn reveal_locked(
        &self,
        session: &mut MatchSession,
        profile: &UserProfile,
        group_id: &GroupId,
        mut machine: ProgressMachine,
    ) -> Result<RevealOutcome, MatchError> {
        if !machine.progress().is_complete() {
            return Ok(RevealOutcome::NotReady {
                progress: machine.progress(),
            });
        }

        let members = session.cache.members(self.store.as_ref(), group_id)?;
        let ranking = rank(profile, members);
        let candidate = next_candidate(&ranking, &profile.current_matches).cloned();

        match machine.try_reveal(candidate.as_ref().map(|entry| entry.other_user_id.clone())) {
            RevealStep::NotReady(progress) => Ok(RevealOutcome::NotReady { progress }),
            RevealStep::Exhausted => {
                debug!(user = %profile.id, group = %group_id, "no unrevealed members left");
                Ok(RevealOutcome::NoCandidate)
            }
            RevealStep::Reveal(matched) => {
                let progress = machine.finish_reveal();
                let patch = ProfilePatch::append_match(matched.clone()).with_progress(progress.value());
                self.store
                    .update_profile(&profile.id, patch)
                    .map_err(write_failure)?;

                let (percent, full_overlap) = candidate
                    .map(|entry| (entry.percent, entry.full_overlap))
                    .unwrap_or((0.0, false));
                info!(user = %profile.id, matched = %matched, percent, "match revealed");

                Ok(RevealOutcome::Revealed(RevealedMatch {
                    user_id: matched,
                    percent,
                    full_overlap,
                    progress,
                    revealed_at: Utc::now(),
                }))
            }
        }
    }

    /// Topics both users rated strongly, for "also likes" hints on a match card.
    pub fn common_affinities(
        &self,
        user_id: &UserId,
        other_id: &UserId,
    ) -> Result<Vec<Topic>, MatchError> {
        let current = self.store.get_profile(user_id)?;
        let other = self.store.get_profile(other_id)?;
        Ok(common_affinities(&current, &other, COMMON_AFFINITY_MIN))
    }

    /// Create a group named `name` with `creator` as its first member and active group.
    pub fn create_group(&self, name: &str, creator: &UserId) -> Result<GroupRecord, MatchError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MatchError::EmptyGroupName);
        }
        self.store.get_profile(creator)?;

        let created = self
            .store
            .create_group(GroupRecord::new(next_group_id().0, name))
            .map_err(write_failure)?;
        let group = self
            .store
            .add_member(&created.id, creator)
            .map_err(write_failure)?;
        self.end_session(creator);
        info!(group = %group.id, creator = %creator, "group created");
        Ok(group)
    }

    /// Add a member to a group and drop every session's lookups so rankings see them.
    pub fn join_group(&self, group_id: &GroupId, user_id: &UserId) -> Result<GroupRecord, MatchError> {
        let group = self
            .store
            .add_member(group_id, user_id)
            .map_err(write_failure)?;
        self.end_session(user_id);
        self.invalidate_all();
        info!(group = %group_id, user = %user_id, members = group.members.len(), "member joined group");
        Ok(group)
    }

    /// Drop one user's cached group lookups.
    pub fn invalidate_lookups(&self, user_id: &UserId) {
        let session = lock(&self.sessions).get(user_id).cloned();
        if let Some(session) = session {
            lock(&session).invalidate();
        }
    }

    /// Drop the user's session with its cached members and question queue.
    ///
    /// Returns `false` when no session was open. The next call for the user starts afresh, so
    /// this belongs between a user's requests rather than alongside them.
    pub fn end_session(&self, user_id: &UserId) -> bool {
        let ended = lock(&self.sessions).remove(user_id).is_some();
        if ended {
            debug!(user = %user_id, "session ended");
        }
        ended
    }

    pub fn open_sessions(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn invalidate_all(&self) {
        let sessions: Vec<_> = lock(&self.sessions).values().cloned().collect();
        for session in sessions {
            lock(&session).invalidate();
        }
        debug!("lookup caches cleared");
    }
}
