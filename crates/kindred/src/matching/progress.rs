use serde::{Deserialize, Serialize};

use super::domain::UserId;

/// Percentage of the way towards the next reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchProgress(u8);

impl MatchProgress {
    pub const ZERO: Self = Self(0);
    pub const COMPLETE: Self = Self(100);

    /// Clamp to `0..=100` and round down onto the increment grid.
    pub fn normalized(raw: i64, increment: u8) -> Self {
        let clamped = raw.clamp(0, 100) as u8;
        let step = increment.max(1);
        Self(clamped - clamped % step)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_complete(self) -> bool {
        self == Self::COMPLETE
    }

    /// Answers still needed before the threshold.
    pub fn remaining_questions(self, increment: u8) -> u8 {
        (100 - self.0) / increment.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressState {
    Accumulating(MatchProgress),
    Revealing(UserId),
    /// Threshold reached but every member has already been revealed.
    Exhausted,
}

/// Result of asking the machine to reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    NotReady(MatchProgress),
    Reveal(UserId),
    Exhausted,
}

/// Ties answered questions to match reveals.
///
/// The persisted `match_progress` is the source of truth, so a machine is resumed from the
/// profile for every request rather than held across them.
#[derive(Debug, Clone)]
pub struct ProgressMachine {
    increment: u8,
    state: ProgressState,
}

impl ProgressMachine {
    pub fn resume(persisted: u8, increment: u8) -> Self {
        Self {
            increment,
            state: ProgressState::Accumulating(MatchProgress::normalized(
                i64::from(persisted),
                increment,
            )),
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn progress(&self) -> MatchProgress {
        match self.state {
            ProgressState::Accumulating(progress) => progress,
            ProgressState::Revealing(_) | ProgressState::Exhausted => MatchProgress::COMPLETE,
        }
    }

    /// Count one answered question. Progress saturates at 100.
    pub fn record_answer(&mut self) -> MatchProgress {
        let next = MatchProgress::normalized(
            i64::from(self.progress().value()) + i64::from(self.increment),
            self.increment,
        );
        self.state = ProgressState::Accumulating(next);
        next
    }

    /// Move to `Revealing` when the threshold is met and a candidate exists.
    ///
    /// Without a candidate the machine parks in `Exhausted`. That state is re-evaluated on
    /// the next call, so a later member joining the group can still be revealed.
    pub fn try_reveal(&mut self, candidate: Option<UserId>) -> RevealStep {
        let progress = self.progress();
        if !progress.is_complete() {
            return RevealStep::NotReady(progress);
        }

        match candidate {
            Some(user) => {
                self.state = ProgressState::Revealing(user.clone());
                RevealStep::Reveal(user)
            }
            None => {
                self.state = ProgressState::Exhausted;
                RevealStep::Exhausted
            }
        }
    }

    /// Leave `Revealing` and start accumulating from zero again.
    pub fn finish_reveal(&mut self) -> MatchProgress {
        if matches!(self.state, ProgressState::Revealing(_)) {
            self.state = ProgressState::Accumulating(MatchProgress::ZERO);
        }
        self.progress()
    }
}
