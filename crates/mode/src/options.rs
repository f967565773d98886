//! Configuration options for the mode session

use std::time::Duration;

/// Configuration options for [`crate::ModeSession`]
#[derive(Debug, Clone)]
pub struct ModeOptions {
    /// Wrong PINs allowed before the gate locks
    pub max_pin_attempts: u32,

    /// How long the gate stays locked
    pub lockout_duration: Duration,

    /// Idle time in parent mode before falling back to child mode
    pub inactivity_timeout: Duration,

    /// How often the inactivity watcher checks
    pub check_interval: Duration,

    /// Auto-switch setting for users who never changed it
    pub auto_switch_default: bool,
}

impl Default for ModeOptions {
    fn default() -> Self {
        Self {
            max_pin_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60),
            inactivity_timeout: Duration::from_secs(15 * 60),
            check_interval: Duration::from_secs(30),
            auto_switch_default: true,
        }
    }
}

impl ModeOptions {
    pub fn with_max_pin_attempts(mut self, value: u32) -> Self {
        self.max_pin_attempts = value.max(1);
        self
    }

    pub fn with_lockout_duration(mut self, value: Duration) -> Self {
        self.lockout_duration = value;
        self
    }

    pub fn with_inactivity_timeout(mut self, value: Duration) -> Self {
        self.inactivity_timeout = value;
        self
    }

    pub fn with_check_interval(mut self, value: Duration) -> Self {
        self.check_interval = value;
        self
    }

    pub fn with_auto_switch_default(mut self, value: bool) -> Self {
        self.auto_switch_default = value;
        self
    }
}
