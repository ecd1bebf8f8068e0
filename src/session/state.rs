use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::violation::ViolationEvent;
use crate::services::platform::GuardPolicy;
use crate::session::violation_monitor::BlockingPrompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unavailable,
    AwaitingStart,
    InProgress,
    Submitting,
    CompletedLocally,
    Submitted,
    Expired,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Unavailable, AwaitingStart)
                | (Unavailable, Expired)
                | (AwaitingStart, InProgress)
                | (AwaitingStart, Expired)
                | (InProgress, Submitting)
                | (Submitting, Submitted)
                | (Submitting, CompletedLocally)
                | (CompletedLocally, Submitting)
        )
    }

    pub fn transition(self, next: SessionState) -> Result<SessionState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition { from: self, to: next })
        }
    }

    pub fn accepts_responses(self) -> bool {
        self == SessionState::InProgress
    }

    /// Submission has begun or finished; further submit triggers are no-ops.
    pub fn is_submission_underway(self) -> bool {
        matches!(
            self,
            SessionState::Submitting | SessionState::CompletedLocally | SessionState::Submitted
        )
    }
}

/// What started the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    Manual,
    TimerExpired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub attempt_id: Option<Uuid>,
    /// Seconds to window open before start, seconds to forced submission while running.
    pub seconds_remaining: Option<u64>,
    pub violation_count: u32,
    pub warnings: Vec<ViolationEvent>,
    pub blocking: Option<BlockingPrompt>,
    pub answered: usize,
    pub total_questions: usize,
    pub pending_saves: usize,
    pub guards: Option<GuardPolicy>,
    pub submit_trigger: Option<SubmitTrigger>,
    pub last_error: Option<String>,
}
