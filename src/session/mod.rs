pub mod autosave;
pub mod engine;
pub mod response_store;
pub mod state;
pub mod submission;
pub mod timer;
pub mod violation_monitor;

use std::time::Duration;

use crate::session::submission::FinalizePolicy;

pub use engine::{ExamSession, SessionHandle};
pub use state::{SessionSnapshot, SessionState, SubmitTrigger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub autosave_debounce: Duration,
    pub camera_poll_interval: Duration,
    pub warning_ttl: Duration,
    pub finalize_max_attempts: u32,
    pub finalize_backoff: Duration,
    pub finalize_max_backoff: Duration,
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_debounce: Duration::from_secs(2),
            camera_poll_interval: Duration::from_secs(3),
            warning_ttl: Duration::from_secs(5),
            finalize_max_attempts: 3,
            finalize_backoff: Duration::from_secs(1),
            finalize_max_backoff: Duration::from_secs(30),
            command_buffer: 64,
        }
    }
}

impl SessionConfig {
    pub fn finalize_policy(&self) -> FinalizePolicy {
        FinalizePolicy {
            max_attempts: self.finalize_max_attempts,
            base_backoff: self.finalize_backoff,
            max_backoff: self.finalize_max_backoff,
        }
    }
}
