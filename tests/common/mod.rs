#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use proctored_exam::error::{Error, Result};
use proctored_exam::models::assignment::{Availability, ProctoringSettings, StartWindow, TestAssignment};
use proctored_exam::models::question::{Question, QuestionSet, QuestionType};
use proctored_exam::models::response::ResponseRecord;
use proctored_exam::models::violation::ViolationEvent;
use proctored_exam::services::bridge_platform::{BridgePlatform, PlatformReport};
use proctored_exam::services::exam_api::ExamApi;
use proctored_exam::session::{ExamSession, SessionConfig, SessionHandle, SessionSnapshot, SessionState};

/// Recording backend with switchable failures.
pub struct FakeExamApi {
    pub assignment: TestAssignment,
    pub questions: QuestionSet,
    pub attempt_id: Uuid,
    latency: Duration,
    slow_save_delay: Duration,
    slow_saves: AtomicU32,
    saves: Mutex<Vec<ResponseRecord>>,
    violations: Mutex<Vec<ViolationEvent>>,
    starts: AtomicU32,
    finalizes: AtomicU32,
    failing_starts: AtomicU32,
    failing_finalizes: AtomicU32,
}

impl FakeExamApi {
    pub fn new(assignment: TestAssignment, questions: QuestionSet) -> Self {
        Self {
            assignment,
            questions,
            attempt_id: Uuid::new_v4(),
            latency: Duration::ZERO,
            slow_save_delay: Duration::ZERO,
            slow_saves: AtomicU32::new(0),
            saves: Mutex::new(Vec::new()),
            violations: Mutex::new(Vec::new()),
            starts: AtomicU32::new(0),
            finalizes: AtomicU32::new(0),
            failing_starts: AtomicU32::new(0),
            failing_finalizes: AtomicU32::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The next `n` saves take `delay` longer than usual.
    pub fn with_slow_saves(self, n: u32, delay: Duration) -> Self {
        self.slow_saves.store(n, Ordering::SeqCst);
        Self {
            slow_save_delay: delay,
            ..self
        }
    }

    pub fn fail_next_starts(&self, n: u32) {
        self.failing_starts.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_finalizes(&self, n: u32) {
        self.failing_finalizes.store(n, Ordering::SeqCst);
    }

    pub fn saves(&self) -> Vec<ResponseRecord> {
        self.saves.lock().unwrap().clone()
    }

    pub fn violations(&self) -> Vec<ViolationEvent> {
        self.violations.lock().unwrap().clone()
    }

    pub fn start_calls(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn finalize_calls(&self) -> u32 {
        self.finalizes.load(Ordering::SeqCst)
    }

    async fn network(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ExamApi for FakeExamApi {
    async fn fetch_assignment(&self, _assignment_id: Uuid, _candidate_id: Uuid) -> Result<TestAssignment> {
        Ok(self.assignment.clone())
    }

    async fn fetch_questions(&self, _test_id: Uuid) -> Result<QuestionSet> {
        Ok(self.questions.clone())
    }

    async fn start_attempt(&self, _assignment_id: Uuid, _candidate_id: Uuid) -> Result<Uuid> {
        self.network().await;
        self.starts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_starts) {
            return Err(Error::Upstream {
                status: 500,
                body: "start failed".into(),
            });
        }
        Ok(self.attempt_id)
    }

    async fn save_response(&self, _attempt_id: Uuid, record: &ResponseRecord) -> Result<()> {
        self.network().await;
        if Self::take_failure(&self.slow_saves) {
            tokio::time::sleep(self.slow_save_delay).await;
        }
        self.saves.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn finalize_attempt(&self, _attempt_id: Uuid) -> Result<()> {
        self.network().await;
        self.finalizes.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_finalizes) {
            return Err(Error::Upstream {
                status: 503,
                body: "finalize unavailable".into(),
            });
        }
        Ok(())
    }

    async fn report_violation(&self, _attempt_id: Uuid, event: &ViolationEvent) -> Result<()> {
        self.network().await;
        self.violations.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub fn questions(n: i32, duration_minutes: i32) -> QuestionSet {
    QuestionSet {
        duration_minutes,
        total_marks: n,
        instructions: Some("Answer every question".into()),
        questions: (1..=n)
            .map(|id| {
                let question_type = match id % 3 {
                    0 => QuestionType::SingleChoice,
                    1 => QuestionType::FreeText,
                    _ => QuestionType::Code,
                };
                Question {
                    id,
                    question_type,
                    question: format!("Question {}", id),
                    marks: 1,
                    options: if question_type.is_choice() {
                        vec!["a".into(), "b".into(), "c".into()]
                    } else {
                        vec![]
                    },
                    language: (question_type == QuestionType::Code).then(|| "rust".to_string()),
                }
            })
            .collect(),
    }
}

pub fn assignment(availability: Availability, proctoring: Option<ProctoringSettings>) -> TestAssignment {
    TestAssignment {
        id: Uuid::new_v4(),
        candidate_id: Uuid::new_v4(),
        test_id: Uuid::new_v4(),
        availability,
        is_proctored: proctoring.is_some(),
        proctoring_settings: proctoring.unwrap_or_default(),
        start_window: None,
    }
}

pub fn windowed(
    availability: Availability,
    opens_at: Option<DateTime<Utc>>,
    closes_at: Option<DateTime<Utc>>,
) -> TestAssignment {
    TestAssignment {
        start_window: Some(StartWindow { opens_at, closes_at }),
        ..assignment(availability, None)
    }
}

pub fn strict() -> ProctoringSettings {
    ProctoringSettings {
        fullscreen_required: true,
        camera_required: true,
        copy_paste_prevention: true,
        tab_switch_detection: true,
    }
}

pub fn granted_bridge() -> Arc<BridgePlatform> {
    let bridge = Arc::new(BridgePlatform::new());
    bridge.report(PlatformReport {
        camera_permission: Some(true),
        fullscreen_permission: Some(true),
        camera_live: Some(true),
    });
    bridge
}

pub async fn load(api: Arc<FakeExamApi>, bridge: Arc<BridgePlatform>) -> Result<SessionHandle> {
    let assignment_id = api.assignment.id;
    let candidate_id = api.assignment.candidate_id;
    let (handle, _task) = ExamSession::load(api, bridge, SessionConfig::default(), assignment_id, candidate_id).await?;
    Ok(handle)
}

pub async fn wait_for_state(handle: &SessionHandle, state: SessionState) -> SessionSnapshot {
    for _ in 0..1_000 {
        let snapshot = handle.snapshot().await.expect("snapshot");
        if snapshot.state == state {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("session never reached {:?}", state);
}

/// Lets spawned network tasks settle without moving the clock much.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
}
