use crate::error::{Result, SyncFileError};
use std::time::Duration;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1);
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(20);
pub const DEFAULT_DELAY_CAP: Duration = Duration::from_millis(600);
pub const DEFAULT_MAX_OVER_CAP_RETRIES: u32 = 8;

/// Tunables of the retry schedule used while waiting for a lock file.
///
/// Delays are handled at millisecond granularity; anything finer is floored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// First delay of every acquisition. Default: 1ms.
    pub initial_delay: Duration,
    /// Delay the schedule restarts from after an over-cap round. Default: 20ms.
    pub restart_delay: Duration,
    /// Once the delay reaches this value, retries are rationed. Default: 600ms.
    pub delay_cap: Duration,
    /// Over-cap rounds allowed before giving up with a timeout. Default: 8.
    pub max_over_cap_retries: u32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            restart_delay: DEFAULT_RESTART_DELAY,
            delay_cap: DEFAULT_DELAY_CAP,
            max_over_cap_retries: DEFAULT_MAX_OVER_CAP_RETRIES,
        }
    }
}

impl LockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    pub fn with_delay_cap(mut self, cap: Duration) -> Self {
        self.delay_cap = cap;
        self
    }

    pub fn with_max_over_cap_retries(mut self, retries: u32) -> Self {
        self.max_over_cap_retries = retries;
        self
    }

    /// Reject schedules that could never reach the cap.
    ///
    /// A delay under one millisecond floors to zero and stays there, so the
    /// acquisition loop would spin without ever timing out.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("initial_delay", self.initial_delay),
            ("restart_delay", self.restart_delay),
            ("delay_cap", self.delay_cap),
        ];
        for (name, value) in fields {
            if value < Duration::from_millis(1) {
                return Err(SyncFileError::InvalidConfig(format!(
                    "{name} must be at least 1ms (got {value:?})"
                )));
            }
        }
        Ok(())
    }
}
