use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;

use super::domain::{normalize_word, Topic, UserProfile};
use super::topics::TopicPool;

/// Per-session queue of survey questions.
///
/// `pending` holds topics waiting to be drawn and `outstanding` the ones currently shown to
/// the user. A word lives in at most one of the two at a time.
#[derive(Debug)]
pub struct QuestionDispenser<R = StdRng> {
    pending: Vec<Topic>,
    queued: HashSet<String>,
    outstanding: Vec<Topic>,
    fallback: Arc<[String]>,
    rng: R,
}

impl<R: Rng> QuestionDispenser<R> {
    pub fn new(fallback: Arc<[String]>, rng: R) -> Self {
        Self {
            pending: Vec::new(),
            queued: HashSet::new(),
            outstanding: Vec::new(),
            fallback,
            rng,
        }
    }

    /// Queue every pool topic the profile has not rated and that is not already in flight.
    pub fn enqueue_unanswered(&mut self, pool: &TopicPool, profile: &UserProfile) -> usize {
        let mut added = 0;
        for topic in pool.unanswered_by(profile) {
            if self.enqueue(topic.clone()) {
                added += 1;
            }
        }
        added
    }

    fn enqueue(&mut self, topic: Topic) -> bool {
        if self.is_outstanding(&topic.word) || !self.queued.insert(topic.word.clone()) {
            return false;
        }
        self.pending.push(topic);
        true
    }

    fn refill_from_fallback(&mut self, profile: &UserProfile) {
        let fallback = Arc::clone(&self.fallback);
        for word in fallback.iter().filter_map(|raw| normalize_word(raw)) {
            if !profile.has_rated(&word) {
                self.enqueue(Topic::interest(word));
            }
        }
    }

    /// Draw a uniformly random pending topic and mark it outstanding.
    ///
    /// An empty queue is refilled from the fallback list first. Topics the profile has
    /// rated since they were queued are discarded. Returns `None` once nothing unrated is
    /// left anywhere.
    pub fn next_question(&mut self, profile: &UserProfile) -> Option<Topic> {
        loop {
            if self.pending.is_empty() {
                self.refill_from_fallback(profile);
                if self.pending.is_empty() {
                    return None;
                }
            }

            let index = self.rng.gen_range(0..self.pending.len());
            let topic = self.pending.swap_remove(index);
            self.queued.remove(&topic.word);

            if profile.has_rated(&topic.word) {
                continue;
            }

            self.outstanding.push(topic.clone());
            return Some(topic);
        }
    }

    /// Draw until `depth` questions are outstanding or the supply runs dry.
    pub fn fill_slots(&mut self, depth: usize, profile: &UserProfile) -> &[Topic] {
        while self.outstanding.len() < depth {
            if self.next_question(profile).is_none() {
                break;
            }
        }
        &self.outstanding
    }

    /// Retire an outstanding question once answered. Returns `false` if it was not shown.
    pub fn retire(&mut self, word: &str) -> bool {
        match self.outstanding.iter().position(|topic| topic.word == word) {
            Some(index) => {
                self.outstanding.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn outstanding(&self) -> &[Topic] {
        &self.outstanding
    }

    pub fn is_outstanding(&self, word: &str) -> bool {
        self.outstanding.iter().any(|topic| topic.word == word)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.queued.clear();
        self.outstanding.clear();
    }
}
