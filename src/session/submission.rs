use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::QuestionSet;
use crate::models::response::ResponseRecord;
use crate::services::exam_api::ExamApi;
use crate::session::autosave::flush_records;
use crate::session::response_store::ResponseStore;
use crate::session::state::SubmitTrigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizePolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for FinalizePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl FinalizePolicy {
    /// Delay after the `failed`-th failed call: base * 2^(failed-1), capped, plus up to 10% jitter.
    pub fn backoff(&self, failed: u32) -> Duration {
        let exp = failed.saturating_sub(1).min(16);
        let raw = self.base_backoff.saturating_mul(1u32 << exp).min(self.max_backoff);
        let jitter_ms = (raw.as_millis() / 10) as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        raw + Duration::from_millis(jitter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub attempt_id: Uuid,
    pub trigger: SubmitTrigger,
    pub records: usize,
    pub saved: usize,
    pub failed: usize,
    pub finalize_calls: u32,
    pub finalized_at: DateTime<Utc>,
}

/// Exactly-once guard plus the records resolved at teardown.
#[derive(Debug, Default)]
pub struct SubmissionCoordinator {
    trigger: Option<SubmitTrigger>,
    records: Option<Arc<Vec<ResponseRecord>>>,
    runs: u32,
}

impl SubmissionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The re-entrancy guard. Only the first caller wins.
    pub fn claim(&mut self, trigger: SubmitTrigger) -> bool {
        if self.trigger.is_some() {
            return false;
        }
        self.trigger = Some(trigger);
        true
    }

    pub fn trigger(&self) -> Option<SubmitTrigger> {
        self.trigger
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Resolves one record per question. Later calls reuse the first resolution.
    pub fn prepare(&mut self, store: &ResponseStore, questions: &QuestionSet, at: DateTime<Utc>) -> Arc<Vec<ResponseRecord>> {
        self.runs += 1;
        self.records
            .get_or_insert_with(|| Arc::new(store.resolve(questions, at)))
            .clone()
    }
}

/// Persists every record (settle-all), then finalizes with retry and backoff.
pub async fn persist_and_finalize(
    api: Arc<dyn ExamApi>,
    attempt_id: Uuid,
    trigger: SubmitTrigger,
    records: Arc<Vec<ResponseRecord>>,
    policy: FinalizePolicy,
) -> Result<SubmissionOutcome> {
    let report = flush_records(api.clone(), attempt_id, records.as_ref().clone()).await;
    if !report.failed.is_empty() {
        warn!(%attempt_id, failed = ?report.failed, "some responses were not persisted before finalize");
    }

    let max_attempts = policy.max_attempts.max(1);
    let mut calls = 0;
    loop {
        calls += 1;
        match api.finalize_attempt(attempt_id).await {
            Ok(()) => {
                info!(%attempt_id, ?trigger, calls, "attempt finalized");
                return Ok(SubmissionOutcome {
                    attempt_id,
                    trigger,
                    records: records.len(),
                    saved: report.saved.len(),
                    failed: report.failed.len(),
                    finalize_calls: calls,
                    finalized_at: Utc::now(),
                });
            }
            Err(e) if calls < max_attempts => {
                let delay = policy.backoff(calls);
                warn!(%attempt_id, error = ?e, calls, ?delay, "finalize failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(%attempt_id, error = ?e, calls, "finalize gave up");
                return Err(Error::FinalizeFailed(format!(
                    "could not finalize attempt after {} calls: {}",
                    calls, e
                )));
            }
        }
    }
}
