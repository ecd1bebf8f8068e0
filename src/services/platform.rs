use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::assignment::ProctoringSettings;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("permission denied: {0}")]
    Denied(String),
    #[error("device unavailable: {0}")]
    Unavailable(String),
}

/// Which native actions the host must cancel and which signals it must forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardPolicy {
    pub watch_fullscreen: bool,
    pub watch_visibility: bool,
    pub block_clipboard: bool,
    pub block_context_menu: bool,
    pub block_shortcuts: bool,
    pub watch_camera: bool,
}

impl GuardPolicy {
    pub fn from_settings(settings: &ProctoringSettings) -> Self {
        Self {
            watch_fullscreen: settings.fullscreen_required,
            watch_visibility: settings.tab_switch_detection,
            block_clipboard: settings.copy_paste_prevention,
            block_context_menu: settings.copy_paste_prevention,
            block_shortcuts: true,
            watch_camera: settings.camera_required,
        }
    }
}

/// Device access and signal interception provided by the host shell.
#[async_trait]
pub trait ProctoringPlatform: Send + Sync + 'static {
    async fn request_camera(&self) -> Result<(), PlatformError>;

    async fn request_fullscreen(&self) -> Result<(), PlatformError>;

    /// True when a capture stream exists and has a live video track.
    fn camera_live(&self) -> bool;

    fn install_guards(&self, policy: &GuardPolicy);

    fn remove_guards(&self);

    /// Stops capture tracks and leaves fullscreen.
    fn release_devices(&self);
}

/// Installed platform guards. Dropping the registration removes them.
pub struct GuardRegistration {
    platform: Arc<dyn ProctoringPlatform>,
    policy: GuardPolicy,
    released: bool,
}

impl GuardRegistration {
    pub fn acquire(platform: Arc<dyn ProctoringPlatform>, policy: GuardPolicy) -> Self {
        platform.install_guards(&policy);
        tracing::debug!(?policy, "proctoring guards installed");
        Self {
            platform,
            policy,
            released: false,
        }
    }

    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.platform.remove_guards();
        self.platform.release_devices();
        tracing::debug!("proctoring guards removed");
    }
}

impl Drop for GuardRegistration {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl std::fmt::Debug for GuardRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardRegistration")
            .field("policy", &self.policy)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingPlatform {
        installs: AtomicUsize,
        removals: AtomicUsize,
        releases: AtomicUsize,
    }

    #[async_trait]
    impl ProctoringPlatform for CountingPlatform {
        async fn request_camera(&self) -> Result<(), PlatformError> {
            Ok(())
        }
        async fn request_fullscreen(&self) -> Result<(), PlatformError> {
            Ok(())
        }
        fn camera_live(&self) -> bool {
            true
        }
        fn install_guards(&self, _policy: &GuardPolicy) {
            self.installs.fetch_add(1, Ordering::SeqCst);
        }
        fn remove_guards(&self) {
            self.removals.fetch_add(1, Ordering::SeqCst);
        }
        fn release_devices(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn explicit_release_then_drop_removes_once() {
        let platform = Arc::new(CountingPlatform::default());
        let registration = GuardRegistration::acquire(platform.clone(), GuardPolicy::default());
        registration.release();
        assert_eq!(platform.installs.load(Ordering::SeqCst), 1);
        assert_eq!(platform.removals.load(Ordering::SeqCst), 1);
        assert_eq!(platform.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_guards() {
        let platform = Arc::new(CountingPlatform::default());
        {
            let _registration = GuardRegistration::acquire(platform.clone(), GuardPolicy::default());
        }
        assert_eq!(platform.removals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shortcuts_always_blocked() {
        let policy = GuardPolicy::from_settings(&ProctoringSettings::default());
        assert!(policy.block_shortcuts);
        assert!(!policy.block_clipboard);
        assert!(!policy.watch_camera);
    }
}
