use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::question::QuestionId;
use crate::models::response::ResponseRecord;
use crate::services::exam_api::ExamApi;

/// Debounce bookkeeping. Every mutation pushes the deadline out by `debounce`.
#[derive(Debug)]
pub struct AutosaveScheduler {
    debounce: Duration,
    deadline: Option<Instant>,
    active: bool,
}

impl AutosaveScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            deadline: None,
            active: false,
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Drops any pending flush; nothing fires after this.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.deadline = None;
    }

    pub fn note_mutation(&mut self, now: Instant) {
        if self.active {
            self.deadline = Some(now + self.debounce);
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.active && self.deadline.is_some()
    }

    /// Consumes the deadline if it has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if self.active && deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Resolves at the armed deadline; never resolves while disarmed.
    pub async fn wait(&self) {
        match self.deadline {
            Some(deadline) if self.active => sleep_until(deadline).await,
            _ => std::future::pending::<()>().await,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub saved: Vec<QuestionId>,
    pub failed: Vec<QuestionId>,
}

/// Saves every record concurrently and waits for all of them to settle.
pub async fn flush_records(api: Arc<dyn ExamApi>, attempt_id: Uuid, records: Vec<ResponseRecord>) -> FlushReport {
    let mut set = JoinSet::new();
    for record in records {
        let api = api.clone();
        set.spawn(async move {
            let result = api.save_response(attempt_id, &record).await;
            (record.question_id, result)
        });
    }

    let mut report = FlushReport::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((question_id, Ok(()))) => report.saved.push(question_id),
            Ok((question_id, Err(e))) => {
                warn!(%attempt_id, question_id, error = ?e, "response save failed");
                report.failed.push(question_id);
            }
            Err(e) => warn!(%attempt_id, error = ?e, "response save task aborted"),
        }
    }
    report.saved.sort_unstable();
    report.failed.sort_unstable();
    debug!(%attempt_id, saved = report.saved.len(), failed = report.failed.len(), "flush settled");
    report
}
