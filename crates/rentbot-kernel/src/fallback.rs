use rentbot_contracts::{FallbackSlots, Intent, StateView};
use thiserror::Error;
use tracing::{info, warn};

use crate::schema::Task;
use crate::tracker::DialogueState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("processing error, retry.")]
    Malformed,
    #[error("unknown intent '{0}', retry.")]
    UnknownIntent(String),
    #[error("out of domain request, only house search, selection, information and comparison are supported.")]
    OutOfDomain,
    #[error("task not coherent with current state: {requested} requested while {current} is incomplete.")]
    Incoherent { current: Intent, requested: Intent },
    #[error("no house selected, search or select first.")]
    NoHouseSelected,
    #[error("no houses to compare, search first.")]
    NoHousesToCompare,
    #[error("error processing request, retry.")]
    CompareRequest,
    #[error("error processing selection, reselect.")]
    Selection,
    #[error("error searching houses, retry.")]
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Fallback(String),
}

impl<C> DialogueState<C> {
    /// Enters `FALLBACK_POLICY` with `reason`. The state preceding the fallback
    /// episode is kept in `last_active_state`; re-entering while already in
    /// fallback only replaces the reason.
    pub fn fallback_policy(&mut self, reason: DomainError) {
        if !matches!(self.task, Task::Fallback(_)) {
            self.last_active_state = Some(self.task.clone());
        }
        warn!(from = %self.task.intent(), reason = %reason, "entering fallback policy");
        self.task = Task::Fallback(FallbackSlots {
            reason: reason.to_string(),
        });
    }

    pub fn resume(&mut self) -> bool {
        if !matches!(self.task, Task::Fallback(_)) {
            return false;
        }
        match self.last_active_state.take() {
            Some(task) => {
                info!(intent = %task.intent(), "resuming state preceding fallback");
                self.task = task;
                true
            }
            None => false,
        }
    }

    pub fn last_active_state(&self) -> Option<StateView> {
        self.last_active_state.as_ref().map(Task::view)
    }

    pub(crate) fn outcome(&self) -> Outcome {
        match &self.task {
            Task::Fallback(slots) => Outcome::Fallback(slots.reason.clone()),
            _ => Outcome::Continue,
        }
    }
}
