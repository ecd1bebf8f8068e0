use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    NotStarted,
    Available,
    Expired,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProctoringSettings {
    #[serde(default)]
    pub fullscreen_required: bool,
    #[serde(default)]
    pub camera_required: bool,
    #[serde(default)]
    pub copy_paste_prevention: bool,
    #[serde(default)]
    pub tab_switch_detection: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWindow {
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAssignment {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub test_id: Uuid,
    pub availability: Availability,
    #[serde(default)]
    pub is_proctored: bool,
    #[serde(default)]
    pub proctoring_settings: ProctoringSettings,
    #[serde(default)]
    pub start_window: Option<StartWindow>,
}

impl TestAssignment {
    /// Settings that actually apply; an unproctored assignment enforces nothing.
    pub fn effective_proctoring(&self) -> Option<ProctoringSettings> {
        self.is_proctored.then_some(self.proctoring_settings)
    }

    pub fn opens_at(&self) -> Option<DateTime<Utc>> {
        self.start_window.and_then(|w| w.opens_at)
    }

    pub fn closes_at(&self) -> Option<DateTime<Utc>> {
        self.start_window.and_then(|w| w.closes_at)
    }
}
