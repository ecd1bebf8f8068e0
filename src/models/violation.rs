use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    FullscreenExit,
    TabSwitch,
    ClipboardAction,
    KeyboardShortcut,
    CameraDisabled,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::FullscreenExit => "fullscreen-exit",
            ViolationKind::TabSwitch => "tab-switch",
            ViolationKind::ClipboardAction => "clipboard-action",
            ViolationKind::KeyboardShortcut => "keyboard-shortcut",
            ViolationKind::CameraDisabled => "camera-disabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationEvent {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub total_violations: u32,
}
