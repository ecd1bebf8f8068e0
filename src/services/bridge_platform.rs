use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::platform::{GuardPolicy, PlatformError, ProctoringPlatform};

/// What the host shell last told us about its devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformReport {
    pub camera_permission: Option<bool>,
    pub fullscreen_permission: Option<bool>,
    pub camera_live: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub camera_permission: Option<bool>,
    pub fullscreen_permission: Option<bool>,
    pub camera_live: bool,
    pub camera_active: bool,
    pub fullscreen_active: bool,
    pub guards: Option<GuardPolicy>,
}

/// Platform backed by reports pushed from the host shell over the loopback API.
///
/// The host owns the real camera and window; it reports permission outcomes
/// and stream liveness here and reads back the guard policy to enforce.
#[derive(Debug, Default)]
pub struct BridgePlatform {
    state: Mutex<BridgeStatus>,
}

impl BridgePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, report: PlatformReport) {
        let mut guard = self.state.lock().expect("bridge state mutex poisoned");
        if let Some(granted) = report.camera_permission {
            guard.camera_permission = Some(granted);
        }
        if let Some(granted) = report.fullscreen_permission {
            guard.fullscreen_permission = Some(granted);
        }
        if let Some(live) = report.camera_live {
            guard.camera_live = live;
        }
    }

    pub fn status(&self) -> BridgeStatus {
        *self.state.lock().expect("bridge state mutex poisoned")
    }
}

#[async_trait]
impl ProctoringPlatform for BridgePlatform {
    async fn request_camera(&self) -> Result<(), PlatformError> {
        let mut guard = self.state.lock().expect("bridge state mutex poisoned");
        match guard.camera_permission {
            Some(true) => {
                guard.camera_active = true;
                Ok(())
            }
            Some(false) => Err(PlatformError::Denied("camera permission refused".to_string())),
            None => Err(PlatformError::Unavailable(
                "host has not reported camera permission".to_string(),
            )),
        }
    }

    async fn request_fullscreen(&self) -> Result<(), PlatformError> {
        let mut guard = self.state.lock().expect("bridge state mutex poisoned");
        match guard.fullscreen_permission {
            Some(true) => {
                guard.fullscreen_active = true;
                Ok(())
            }
            Some(false) => Err(PlatformError::Denied("fullscreen request refused".to_string())),
            None => Err(PlatformError::Unavailable(
                "host has not reported fullscreen capability".to_string(),
            )),
        }
    }

    fn camera_live(&self) -> bool {
        let guard = self.state.lock().expect("bridge state mutex poisoned");
        guard.camera_active && guard.camera_live
    }

    fn install_guards(&self, policy: &GuardPolicy) {
        self.state.lock().expect("bridge state mutex poisoned").guards = Some(*policy);
    }

    fn remove_guards(&self) {
        self.state.lock().expect("bridge state mutex poisoned").guards = None;
    }

    fn release_devices(&self) {
        let mut guard = self.state.lock().expect("bridge state mutex poisoned");
        guard.camera_active = false;
        guard.fullscreen_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreported_camera_is_unavailable() {
        let bridge = BridgePlatform::new();
        assert!(matches!(
            bridge.request_camera().await,
            Err(PlatformError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn camera_live_needs_active_stream() {
        let bridge = BridgePlatform::new();
        bridge.report(PlatformReport {
            camera_permission: Some(true),
            camera_live: Some(true),
            ..Default::default()
        });
        assert!(!bridge.camera_live());
        bridge.request_camera().await.unwrap();
        assert!(bridge.camera_live());
        bridge.release_devices();
        assert!(!bridge.camera_live());
    }

    #[test]
    fn partial_report_keeps_previous_values() {
        let bridge = BridgePlatform::new();
        bridge.report(PlatformReport {
            fullscreen_permission: Some(false),
            ..Default::default()
        });
        bridge.report(PlatformReport {
            camera_live: Some(true),
            ..Default::default()
        });
        let status = bridge.status();
        assert_eq!(status.fullscreen_permission, Some(false));
        assert!(status.camera_live);
    }
}
