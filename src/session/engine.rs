//! The session loop.
//!
//! One task owns every piece of mutable session state. Commands from
//! [`SessionHandle`], completions of spawned network calls, countdown
//! observations, the autosave deadline, camera polls and the window-close
//! deadline are multiplexed with `select!`, so handlers never interleave.
//! Network calls run on spawned tasks and report back as events; nothing
//! in the loop awaits I/O.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Error, PreconditionFailure, Result};
use crate::models::assignment::{Availability, ProctoringSettings, TestAssignment};
use crate::models::question::{QuestionId, QuestionSet};
use crate::models::response::{AnswerPayload, Response, ResponseRecord};
use crate::models::test_attempt::TestAttempt;
use crate::models::violation::ViolationEvent;
use crate::services::exam_api::ExamApi;
use crate::services::platform::ProctoringPlatform;
use crate::session::autosave::{flush_records, AutosaveScheduler, FlushReport};
use crate::session::response_store::ResponseStore;
use crate::session::state::{SessionSnapshot, SessionState, SubmitTrigger};
use crate::session::submission::{persist_and_finalize, SubmissionCoordinator, SubmissionOutcome};
use crate::session::timer::{Countdown, ExpiryLatch};
use crate::session::violation_monitor::{report_violation, PlatformSignal, SignalVerdict, ViolationMonitor};
use crate::session::SessionConfig;
use crate::utils::time::{ceil_seconds, until};

type Reply<T> = oneshot::Sender<Result<T>>;

enum SessionCommand {
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Begin(Reply<SessionSnapshot>),
    Answer {
        question_id: QuestionId,
        answer: AnswerPayload,
        reply: Reply<Response>,
    },
    Save {
        question_id: QuestionId,
        reply: Reply<()>,
    },
    Signal {
        signal: PlatformSignal,
        reply: oneshot::Sender<SignalVerdict>,
    },
    Submit(Reply<SessionSnapshot>),
    RetryFinalize(Reply<SessionSnapshot>),
    Shutdown,
}

enum SessionEvent {
    StartSettled {
        result: Result<Uuid>,
        reply: Reply<SessionSnapshot>,
    },
    FlushSettled(FlushReport),
    SaveSettled {
        question_id: QuestionId,
        result: Result<()>,
        reply: Reply<()>,
    },
    SubmissionSettled(Result<SubmissionOutcome>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountdownUse {
    WindowOpen,
    Attempt,
}

/// Static facts about the loaded session, shared with every handle.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub assignment: TestAssignment,
    pub questions: QuestionSet,
}

#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    info: Arc<SessionInfo>,
}

impl SessionHandle {
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.info.questions
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionCommand::Snapshot(reply)).await?;
        Ok(rx.await?)
    }

    /// Checks proctoring preconditions, starts the attempt remotely and enters `InProgress`.
    pub async fn begin(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionCommand::Begin(reply)).await?;
        rx.await?
    }

    pub async fn answer(&self, question_id: QuestionId, answer: AnswerPayload) -> Result<Response> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Answer {
                question_id,
                answer,
                reply,
            })
            .await?;
        rx.await?
    }

    /// Saves one response now, outside the debounce cycle.
    pub async fn save(&self, question_id: QuestionId) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionCommand::Save { question_id, reply }).await?;
        rx.await?
    }

    pub async fn signal(&self, signal: PlatformSignal) -> Result<SignalVerdict> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionCommand::Signal { signal, reply }).await?;
        Ok(rx.await?)
    }

    /// Resolves once the submission settles. A repeat call is a no-op returning the current snapshot.
    pub async fn submit(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionCommand::Submit(reply)).await?;
        rx.await?
    }

    pub async fn retry_finalize(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionCommand::RetryFinalize(reply)).await?;
        rx.await?
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(SessionCommand::Shutdown).await;
    }
}

pub struct ExamSession {
    api: Arc<dyn ExamApi>,
    platform: Arc<dyn ProctoringPlatform>,
    config: SessionConfig,
    info: Arc<SessionInfo>,
    proctoring: Option<ProctoringSettings>,

    state: SessionState,
    attempt: Option<TestAttempt>,
    starting: bool,
    last_error: Option<String>,

    countdown: Option<Countdown>,
    countdown_rx: Option<watch::Receiver<u64>>,
    countdown_use: CountdownUse,
    expiry: ExpiryLatch,
    window_closes: Option<Instant>,
    closed_while_starting: bool,

    monitor: ViolationMonitor,
    store: ResponseStore,
    autosave: AutosaveScheduler,
    saves_in_flight: Vec<JoinHandle<()>>,
    submission: SubmissionCoordinator,
    submit_waiters: Vec<Reply<SessionSnapshot>>,

    commands: mpsc::Receiver<SessionCommand>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl ExamSession {
    /// Fetches the assignment and questions, then spawns the session loop.
    pub async fn load(
        api: Arc<dyn ExamApi>,
        platform: Arc<dyn ProctoringPlatform>,
        config: SessionConfig,
        assignment_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<(SessionHandle, JoinHandle<()>)> {
        let assignment = api.fetch_assignment(assignment_id, candidate_id).await?;
        if assignment.availability == Availability::Completed {
            return Err(Error::AlreadyCompleted);
        }
        let questions = api.fetch_questions(assignment.test_id).await?;
        info!(
            %assignment_id,
            test_id = %assignment.test_id,
            questions = questions.questions.len(),
            duration_minutes = questions.duration_minutes,
            proctored = assignment.is_proctored,
            "session loaded"
        );

        let (tx, commands) = mpsc::channel(config.command_buffer.max(1));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let proctoring = assignment.effective_proctoring();
        let info = Arc::new(SessionInfo { assignment, questions });

        let mut session = ExamSession {
            api,
            platform,
            monitor: ViolationMonitor::new(proctoring.unwrap_or_default(), config.warning_ttl),
            autosave: AutosaveScheduler::new(config.autosave_debounce),
            config,
            info: info.clone(),
            proctoring,
            state: SessionState::Unavailable,
            attempt: None,
            starting: false,
            last_error: None,
            countdown: None,
            countdown_rx: None,
            countdown_use: CountdownUse::WindowOpen,
            expiry: ExpiryLatch::default(),
            window_closes: None,
            closed_while_starting: false,
            saves_in_flight: Vec::new(),
            store: ResponseStore::new(),
            submission: SubmissionCoordinator::new(),
            submit_waiters: Vec::new(),
            commands,
            events_tx,
            events_rx,
        };
        session.settle_availability(Utc::now());

        let task = tokio::spawn(session.run());
        Ok((SessionHandle { tx, info }, task))
    }

    fn settle_availability(&mut self, now: DateTime<Utc>) {
        let assignment = &self.info.assignment;
        let closes_at = assignment.closes_at();
        let opens_at = assignment.opens_at();
        let closed = closes_at.is_some_and(|c| c <= now);

        self.state = match assignment.availability {
            Availability::Expired => SessionState::Expired,
            _ if closed => SessionState::Expired,
            Availability::Available => SessionState::AwaitingStart,
            Availability::NotStarted => match opens_at {
                Some(opens) if opens <= now => SessionState::AwaitingStart,
                _ => SessionState::Unavailable,
            },
            Availability::Completed => SessionState::Submitted,
        };

        if self.state == SessionState::Unavailable {
            if let Some(opens) = opens_at {
                self.start_countdown(CountdownUse::WindowOpen, ceil_seconds(until(opens, now)));
            }
        }

        if matches!(self.state, SessionState::Unavailable | SessionState::AwaitingStart) {
            self.window_closes = closes_at.map(|c| Instant::now() + until(c, now));
        }
        info!(state = ?self.state, "initial session state");
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                value = next_countdown_value(&mut self.countdown_rx) => self.on_countdown(value),
                _ = self.autosave.wait(), if self.autosave.is_armed() => self.flush_dirty(),
                _ = self.monitor.next_camera_poll(), if self.monitor.polls_camera() => self.poll_camera(),
                _ = sleep_until_opt(self.window_closes), if self.window_closes.is_some() => self.on_window_closed(),
            }
        }
        self.teardown_live();
        info!(state = ?self.state, "session loop stopped");
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::Begin(reply) => self.begin(reply),
            SessionCommand::Answer {
                question_id,
                answer,
                reply,
            } => {
                let _ = reply.send(self.record_answer(question_id, answer));
            }
            SessionCommand::Save { question_id, reply } => self.save_now(question_id, reply),
            SessionCommand::Signal { signal, reply } => {
                let _ = reply.send(self.on_signal(signal));
            }
            SessionCommand::Submit(reply) => self.submit_manually(reply),
            SessionCommand::RetryFinalize(reply) => self.retry_finalize(reply),
            SessionCommand::Shutdown => {}
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StartSettled { result, reply } => self.on_start_settled(result, reply),
            SessionEvent::FlushSettled(report) => {
                if !report.failed.is_empty() {
                    self.store.mark_dirty(report.failed.iter().copied());
                }
            }
            SessionEvent::SaveSettled {
                question_id,
                result,
                reply,
            } => {
                if result.is_err() {
                    self.store.mark_dirty([question_id]);
                }
                let _ = reply.send(result);
            }
            SessionEvent::SubmissionSettled(result) => self.on_submission_settled(result),
        }
    }

    fn snapshot(&mut self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            attempt_id: self.attempt.as_ref().map(|a| a.id),
            seconds_remaining: self.countdown.as_ref().map(Countdown::remaining),
            violation_count: self.monitor.count(),
            warnings: self.monitor.live_warnings(Instant::now()),
            blocking: self.monitor.blocking(),
            answered: self.store.len(),
            total_questions: self.info.questions.questions.len(),
            pending_saves: self.store.dirty_count(),
            guards: self.monitor.guard_policy(),
            submit_trigger: self.submission.trigger(),
            last_error: self.last_error.clone(),
        }
    }

    fn start_countdown(&mut self, usage: CountdownUse, seconds: u64) {
        let countdown = Countdown::start(seconds);
        self.countdown_rx = Some(countdown.subscribe());
        self.countdown = Some(countdown);
        self.countdown_use = usage;
        self.expiry = ExpiryLatch::default();
        debug!(?usage, seconds, "countdown started");
        // A zero-length countdown never publishes a change.
        if seconds == 0 {
            self.on_countdown(Some(0));
        }
    }

    fn stop_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.countdown_rx = None;
    }

    fn on_countdown(&mut self, value: Option<u64>) {
        let Some(remaining) = value else {
            self.countdown_rx = None;
            return;
        };
        if !self.expiry.observe(remaining) {
            return;
        }
        match self.countdown_use {
            CountdownUse::WindowOpen => {
                self.stop_countdown();
                if self.state == SessionState::Unavailable {
                    self.apply(SessionState::AwaitingStart);
                }
            }
            CountdownUse::Attempt => {
                info!(attempt_id = ?self.attempt.as_ref().map(|a| a.id), "time expired");
                self.begin_submission(SubmitTrigger::TimerExpired, None);
            }
        }
    }

    fn on_window_closed(&mut self) {
        self.window_closes = None;
        if self.starting {
            debug!("window closed while a start request is in flight; backend decides");
            self.closed_while_starting = true;
            return;
        }
        if matches!(self.state, SessionState::Unavailable | SessionState::AwaitingStart) {
            self.stop_countdown();
            self.apply(SessionState::Expired);
        }
    }

    fn begin(&mut self, reply: Reply<SessionSnapshot>) {
        if self.state != SessionState::AwaitingStart {
            let _ = reply.send(Err(Error::InvalidTransition {
                from: self.state,
                to: SessionState::InProgress,
            }));
            return;
        }
        if self.starting {
            let _ = reply.send(Err(Error::BadRequest("Start is already in progress".to_string())));
            return;
        }
        self.starting = true;

        let api = self.api.clone();
        let platform = self.platform.clone();
        let proctoring = self.proctoring;
        let assignment_id = self.info.assignment.id;
        let candidate_id = self.info.assignment.candidate_id;
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = start_attempt(api, platform, proctoring, assignment_id, candidate_id).await;
            let _ = events.send(SessionEvent::StartSettled { result, reply });
        });
    }

    fn on_start_settled(&mut self, result: Result<Uuid>, reply: Reply<SessionSnapshot>) {
        self.starting = false;
        let window_closed = std::mem::take(&mut self.closed_while_starting);
        let attempt_id = match result {
            Ok(id) => id,
            Err(e) => {
                warn!(error = ?e, "attempt did not start");
                self.last_error = Some(e.to_string());
                if window_closed && self.state == SessionState::AwaitingStart {
                    self.apply(SessionState::Expired);
                }
                let _ = reply.send(Err(e));
                return;
            }
        };
        if self.state != SessionState::AwaitingStart {
            error!(%attempt_id, state = ?self.state, "attempt started after the session left AwaitingStart");
            let _ = reply.send(Err(Error::InvalidTransition {
                from: self.state,
                to: SessionState::InProgress,
            }));
            return;
        }

        let assignment = &self.info.assignment;
        self.attempt = Some(TestAttempt::start(
            attempt_id,
            assignment.id,
            assignment.candidate_id,
            Utc::now(),
        ));
        self.last_error = None;
        self.window_closes = None;
        self.apply(SessionState::InProgress);

        if self.proctoring.is_some() {
            self.monitor
                .activate(self.platform.clone(), self.config.camera_poll_interval);
        }
        self.autosave.activate();
        let duration = self.info.questions.duration_seconds();
        info!(%attempt_id, duration_seconds = duration, "attempt in progress");
        // Reply before a zero-length timer can move the state on.
        let _ = reply.send(Ok(self.snapshot()));
        self.start_countdown(CountdownUse::Attempt, duration);
    }

    fn record_answer(&mut self, question_id: QuestionId, answer: AnswerPayload) -> Result<Response> {
        if !self.state.accepts_responses() {
            return Err(Error::NotAccepting(self.state));
        }
        let question = self
            .info
            .questions
            .find(question_id)
            .ok_or_else(|| Error::NotFound(format!("Question {} is not part of this test", question_id)))?;
        answer.validate_for(question)?;
        let response = self.store.upsert(question_id, answer, Utc::now())?.clone();
        self.autosave.note_mutation(Instant::now());
        Ok(response)
    }

    fn to_record(&self, response: &Response) -> Option<ResponseRecord> {
        self.info
            .questions
            .find(response.question_id)
            .map(|q| ResponseRecord::from_response(response, q.question_type))
    }

    fn flush_dirty(&mut self) {
        if !self.autosave.fire(Instant::now()) {
            return;
        }
        let Some(attempt_id) = self.attempt.as_ref().map(|a| a.id) else {
            return;
        };
        let records: Vec<ResponseRecord> = self
            .store
            .take_dirty()
            .iter()
            .filter_map(|r| self.to_record(r))
            .collect();
        if records.is_empty() {
            return;
        }
        debug!(%attempt_id, count = records.len(), "autosave flush");
        let api = self.api.clone();
        let events = self.events_tx.clone();
        self.track_save(tokio::spawn(async move {
            let report = flush_records(api, attempt_id, records).await;
            let _ = events.send(SessionEvent::FlushSettled(report));
        }));
    }

    fn save_now(&mut self, question_id: QuestionId, reply: Reply<()>) {
        if !self.state.accepts_responses() {
            let _ = reply.send(Err(Error::NotAccepting(self.state)));
            return;
        }
        let Some(attempt_id) = self.attempt.as_ref().map(|a| a.id) else {
            let _ = reply.send(Err(Error::Internal("attempt id missing while in progress".to_string())));
            return;
        };
        let Some(record) = self.store.take_one(question_id).and_then(|r| self.to_record(&r)) else {
            let _ = reply.send(Err(Error::NotFound(format!(
                "No answer recorded for question {}",
                question_id
            ))));
            return;
        };
        let api = self.api.clone();
        let events = self.events_tx.clone();
        self.track_save(tokio::spawn(async move {
            let result = api.save_response(attempt_id, &record).await;
            if let Err(e) = &result {
                warn!(%attempt_id, question_id, error = ?e, "explicit save failed");
            }
            let _ = events.send(SessionEvent::SaveSettled {
                question_id,
                result,
                reply,
            });
        }));
    }

    fn track_save(&mut self, task: JoinHandle<()>) {
        self.saves_in_flight.retain(|t| !t.is_finished());
        self.saves_in_flight.push(task);
    }

    fn on_signal(&mut self, signal: PlatformSignal) -> SignalVerdict {
        let verdict = self.monitor.evaluate(&signal, Utc::now());
        if let Some(event) = verdict.violation.clone() {
            self.report(event);
        }
        verdict
    }

    fn poll_camera(&mut self) {
        let live = self.platform.camera_live();
        if let Some(event) = self.monitor.check_camera(live, Utc::now()) {
            self.report(event);
        }
    }

    fn report(&self, event: ViolationEvent) {
        let Some(attempt_id) = self.attempt.as_ref().map(|a| a.id) else {
            return;
        };
        tokio::spawn(report_violation(self.api.clone(), attempt_id, event));
    }

    fn submit_manually(&mut self, reply: Reply<SessionSnapshot>) {
        match self.state {
            SessionState::InProgress => self.begin_submission(SubmitTrigger::Manual, Some(reply)),
            SessionState::Submitting => self.submit_waiters.push(reply),
            SessionState::CompletedLocally | SessionState::Submitted => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            other => {
                let _ = reply.send(Err(Error::InvalidTransition {
                    from: other,
                    to: SessionState::Submitting,
                }));
            }
        }
    }

    fn begin_submission(&mut self, trigger: SubmitTrigger, reply: Option<Reply<SessionSnapshot>>) {
        // Checked before anything else so a racing second trigger cannot pass.
        if !self.submission.claim(trigger) {
            debug!(?trigger, "submission already claimed");
            if let Some(reply) = reply {
                let _ = reply.send(Ok(self.snapshot()));
            }
            return;
        }
        self.teardown_live();
        self.apply(SessionState::Submitting);
        if let Some(reply) = reply {
            self.submit_waiters.push(reply);
        }
        self.spawn_submission(trigger);
    }

    fn retry_finalize(&mut self, reply: Reply<SessionSnapshot>) {
        if self.state != SessionState::CompletedLocally {
            let _ = reply.send(Err(Error::InvalidTransition {
                from: self.state,
                to: SessionState::Submitting,
            }));
            return;
        }
        let trigger = self.submission.trigger().unwrap_or(SubmitTrigger::Manual);
        self.apply(SessionState::Submitting);
        self.submit_waiters.push(reply);
        self.spawn_submission(trigger);
    }

    fn spawn_submission(&mut self, trigger: SubmitTrigger) {
        let Some(attempt_id) = self.attempt.as_ref().map(|a| a.id) else {
            self.on_submission_settled(Err(Error::Internal("no attempt to finalize".to_string())));
            return;
        };
        let records = self
            .submission
            .prepare(&self.store, &self.info.questions, Utc::now());
        info!(%attempt_id, ?trigger, records = records.len(), run = self.submission.runs(), "submitting attempt");
        let api = self.api.clone();
        let policy = self.config.finalize_policy();
        let events = self.events_tx.clone();
        // Earlier saves must land before the final records overwrite them.
        let in_flight = std::mem::take(&mut self.saves_in_flight);
        tokio::spawn(async move {
            for task in in_flight {
                let _ = task.await;
            }
            let result = persist_and_finalize(api, attempt_id, trigger, records, policy).await;
            let _ = events.send(SessionEvent::SubmissionSettled(result));
        });
    }

    fn on_submission_settled(&mut self, result: Result<SubmissionOutcome>) {
        let waiters = std::mem::take(&mut self.submit_waiters);
        match result {
            Ok(outcome) => {
                let time_spent_seconds = self.attempt.as_mut().and_then(|attempt| {
                    attempt.finish(outcome.finalized_at);
                    attempt.time_spent_seconds()
                });
                info!(
                    attempt_id = %outcome.attempt_id,
                    ?time_spent_seconds,
                    saved = outcome.saved,
                    failed = outcome.failed,
                    finalize_calls = outcome.finalize_calls,
                    "attempt submitted"
                );
                self.last_error = None;
                self.apply(SessionState::Submitted);
                let snapshot = self.snapshot();
                for waiter in waiters {
                    let _ = waiter.send(Ok(snapshot.clone()));
                }
            }
            Err(e) => {
                let message = match e {
                    Error::FinalizeFailed(message) => message,
                    other => other.to_string(),
                };
                error!(error = %message, "attempt left completed locally");
                self.last_error = Some(message.clone());
                self.apply(SessionState::CompletedLocally);
                for waiter in waiters {
                    let _ = waiter.send(Err(Error::FinalizeFailed(message.clone())));
                }
            }
        }
    }

    /// Stops everything that could still observe the candidate. Idempotent.
    fn teardown_live(&mut self) {
        self.monitor.deactivate();
        self.stop_countdown();
        self.autosave.deactivate();
        self.window_closes = None;
        if self.state.is_submission_underway() || self.state == SessionState::InProgress {
            self.store.seal();
        }
    }

    fn apply(&mut self, next: SessionState) {
        match self.state.transition(next) {
            Ok(state) => {
                info!(from = ?self.state, to = ?state, "session transition");
                self.state = state;
            }
            Err(e) => error!(error = %e, "rejected session transition"),
        }
    }
}

async fn start_attempt(
    api: Arc<dyn ExamApi>,
    platform: Arc<dyn ProctoringPlatform>,
    proctoring: Option<ProctoringSettings>,
    assignment_id: Uuid,
    candidate_id: Uuid,
) -> Result<Uuid> {
    if let Some(settings) = proctoring {
        if settings.camera_required {
            if let Err(e) = platform.request_camera().await {
                warn!(error = %e, "camera precondition failed");
                return Err(Error::Precondition(PreconditionFailure::CameraDenied));
            }
        }
        if settings.fullscreen_required {
            if let Err(e) = platform.request_fullscreen().await {
                warn!(error = %e, "fullscreen precondition failed");
                platform.release_devices();
                return Err(Error::Precondition(PreconditionFailure::FullscreenDenied));
            }
        }
    }

    match api.start_attempt(assignment_id, candidate_id).await {
        Ok(id) => Ok(id),
        Err(e) => {
            if proctoring.is_some() {
                platform.release_devices();
            }
            Err(Error::StartFailed(e.to_string()))
        }
    }
}

async fn next_countdown_value(rx: &mut Option<watch::Receiver<u64>>) -> Option<u64> {
    match rx {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(*rx.borrow_and_update()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
