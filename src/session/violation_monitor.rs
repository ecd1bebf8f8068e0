//! Proctoring signal evaluation.
//!
//! The monitor turns host signals into verdicts (suppress the native action,
//! count a violation, raise or dismiss the fullscreen prompt) and polls
//! camera liveness. It holds the platform guard registration for as long as
//! it is active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::assignment::ProctoringSettings;
use crate::models::violation::{ViolationEvent, ViolationKind};
use crate::services::exam_api::ExamApi;
use crate::services::platform::{GuardPolicy, GuardRegistration, ProctoringPlatform};

const RESTRICTED_WITH_MODIFIER: [&str; 8] = ["c", "v", "x", "a", "z", "y", "p", "s"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardAction {
    Copy,
    Paste,
    Cut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformSignal {
    FullscreenChanged {
        active: bool,
    },
    VisibilityChanged {
        hidden: bool,
    },
    Clipboard {
        action: ClipboardAction,
    },
    ContextMenu,
    KeyDown {
        key: String,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        meta: bool,
        #[serde(default)]
        alt: bool,
        #[serde(default)]
        shift: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    FullscreenRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingPrompt {
    pub reason: BlockReason,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalVerdict {
    /// The host must cancel the native action.
    pub suppress: bool,
    pub violation: Option<ViolationEvent>,
    pub blocking: Option<BlockingPrompt>,
    pub violation_count: u32,
}

#[derive(Debug, Clone)]
struct Warning {
    event: ViolationEvent,
    expires_at: Instant,
}

pub fn is_restricted_key(key: &str, ctrl: bool, meta: bool) -> bool {
    if key.eq_ignore_ascii_case("escape") {
        return true;
    }
    if let Some(n) = key.strip_prefix('F').and_then(|rest| rest.parse::<u8>().ok()) {
        if (1..=12).contains(&n) {
            return true;
        }
    }
    (ctrl || meta) && RESTRICTED_WITH_MODIFIER.iter().any(|k| key.eq_ignore_ascii_case(k))
}

fn describe_shortcut(key: &str, ctrl: bool, meta: bool) -> String {
    match (ctrl, meta) {
        (true, _) => format!("Ctrl+{}", key.to_uppercase()),
        (false, true) => format!("Meta+{}", key.to_uppercase()),
        _ => key.to_string(),
    }
}

#[derive(Debug)]
pub struct ViolationMonitor {
    settings: ProctoringSettings,
    warning_ttl: Duration,
    count: u32,
    history: Vec<ViolationEvent>,
    warnings: VecDeque<Warning>,
    blocking: Option<BlockingPrompt>,
    registration: Option<GuardRegistration>,
    camera_poll: Option<Interval>,
    active: bool,
}

impl ViolationMonitor {
    pub fn new(settings: ProctoringSettings, warning_ttl: Duration) -> Self {
        Self {
            settings,
            warning_ttl,
            count: 0,
            history: Vec::new(),
            warnings: VecDeque::new(),
            blocking: None,
            registration: None,
            camera_poll: None,
            active: false,
        }
    }

    pub fn activate(&mut self, platform: Arc<dyn ProctoringPlatform>, camera_poll_every: Duration) {
        if self.active {
            return;
        }
        self.registration = Some(GuardRegistration::acquire(
            platform,
            GuardPolicy::from_settings(&self.settings),
        ));
        if self.settings.camera_required {
            let mut poll = interval_at(Instant::now() + camera_poll_every, camera_poll_every);
            poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.camera_poll = Some(poll);
        }
        self.active = true;
        info!(settings = ?self.settings, "violation monitor active");
    }

    /// Synchronous teardown: guards removed, camera polling stopped, prompt cleared.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.camera_poll = None;
        self.blocking = None;
        if let Some(registration) = self.registration.take() {
            registration.release();
        }
        info!(violations = self.count, "violation monitor stopped");
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn history(&self) -> &[ViolationEvent] {
        &self.history
    }

    pub fn blocking(&self) -> Option<BlockingPrompt> {
        self.blocking
    }

    pub fn guard_policy(&self) -> Option<GuardPolicy> {
        self.registration.as_ref().map(|r| *r.policy())
    }

    pub fn polls_camera(&self) -> bool {
        self.active && self.camera_poll.is_some()
    }

    /// Next camera poll tick; pending forever when polling is off.
    pub async fn next_camera_poll(&mut self) {
        match self.camera_poll.as_mut() {
            Some(poll) if self.active => {
                poll.tick().await;
            }
            _ => std::future::pending::<()>().await,
        }
    }

    pub fn evaluate(&mut self, signal: &PlatformSignal, at: DateTime<Utc>) -> SignalVerdict {
        if !self.active {
            return self.verdict(false, None);
        }

        match signal {
            PlatformSignal::FullscreenChanged { active: false } if self.settings.fullscreen_required => {
                let event = self.record(ViolationKind::FullscreenExit, "Fullscreen mode was exited".into(), at);
                self.blocking = Some(BlockingPrompt {
                    reason: BlockReason::FullscreenRequired,
                    raised_at: at,
                });
                self.verdict(false, Some(event))
            }
            PlatformSignal::FullscreenChanged { active: true } => {
                if self.blocking.take().is_some() {
                    debug!("fullscreen restored, prompt dismissed");
                }
                self.verdict(false, None)
            }
            PlatformSignal::VisibilityChanged { hidden: true } if self.settings.tab_switch_detection => {
                let event = self.record(
                    ViolationKind::TabSwitch,
                    "Switching tabs or windows is not allowed".into(),
                    at,
                );
                self.verdict(false, Some(event))
            }
            PlatformSignal::Clipboard { action } if self.settings.copy_paste_prevention => {
                let verb = match action {
                    ClipboardAction::Copy => "Copying",
                    ClipboardAction::Paste => "Pasting",
                    ClipboardAction::Cut => "Cutting",
                };
                let event = self.record(
                    ViolationKind::ClipboardAction,
                    format!("{} is disabled during the test", verb),
                    at,
                );
                self.verdict(true, Some(event))
            }
            PlatformSignal::ContextMenu if self.settings.copy_paste_prevention => {
                let event = self.record(
                    ViolationKind::ClipboardAction,
                    "Right-click is disabled during the test".into(),
                    at,
                );
                self.verdict(true, Some(event))
            }
            PlatformSignal::KeyDown { key, ctrl, meta, .. } if is_restricted_key(key, *ctrl, *meta) => {
                let event = self.record(
                    ViolationKind::KeyboardShortcut,
                    format!("{} is disabled during the test", describe_shortcut(key, *ctrl, *meta)),
                    at,
                );
                self.verdict(true, Some(event))
            }
            _ => self.verdict(false, None),
        }
    }

    /// One violation per poll while the camera is not live.
    pub fn check_camera(&mut self, live: bool, at: DateTime<Utc>) -> Option<ViolationEvent> {
        if !self.active || !self.settings.camera_required || live {
            return None;
        }
        Some(self.record(
            ViolationKind::CameraDisabled,
            "Camera is not active".into(),
            at,
        ))
    }

    /// Warnings younger than the TTL; older ones are dropped.
    pub fn live_warnings(&mut self, now: Instant) -> Vec<ViolationEvent> {
        while self.warnings.front().is_some_and(|w| w.expires_at <= now) {
            self.warnings.pop_front();
        }
        self.warnings.iter().map(|w| w.event.clone()).collect()
    }

    fn record(&mut self, kind: ViolationKind, message: String, at: DateTime<Utc>) -> ViolationEvent {
        self.count += 1;
        let event = ViolationEvent {
            kind,
            message,
            timestamp: at,
            total_violations: self.count,
        };
        warn!(kind = kind.as_str(), total = self.count, "proctoring violation");
        self.history.push(event.clone());
        self.warnings.push_back(Warning {
            event: event.clone(),
            expires_at: Instant::now() + self.warning_ttl,
        });
        event
    }

    fn verdict(&self, suppress: bool, violation: Option<ViolationEvent>) -> SignalVerdict {
        SignalVerdict {
            suppress,
            violation,
            blocking: self.blocking,
            violation_count: self.count,
        }
    }
}

impl Drop for ViolationMonitor {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Fire-and-forget report. Failures are logged and dropped.
pub async fn report_violation(api: Arc<dyn ExamApi>, attempt_id: Uuid, event: ViolationEvent) {
    if let Err(e) = api.report_violation(attempt_id, &event).await {
        warn!(%attempt_id, kind = event.kind.as_str(), error = ?e, "violation report dropped");
    }
}
