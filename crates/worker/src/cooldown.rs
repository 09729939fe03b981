use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Suppresses new work for a fixed window once failures pile up.
///
/// Only a success resets the failure count. Entering cooldown does not, so
/// one more failure after the window expires starts a new cooldown.
#[derive(Debug, Clone, Serialize)]
pub struct FailureCooldownPolicy {
    max_consecutive_failures: u32,
    window_seconds: u64,
    consecutive_failures: u32,
    cooldown_until: Option<DateTime<Utc>>,
}

impl FailureCooldownPolicy {
    pub fn new(max_consecutive_failures: u32, window: Duration) -> Self {
        Self {
            max_consecutive_failures,
            window_seconds: window.as_secs(),
            consecutive_failures: 0,
            cooldown_until: None,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Last cooldown deadline, whether or not it has passed.
    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.cooldown_until
    }

    /// The cooldown deadline if it is still in the future.
    pub fn active_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cooldown_until.filter(|until| now < *until)
    }

    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        self.active_until(now).is_some()
    }

    /// Reset the failure streak. An active cooldown keeps running.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Count a failure. Returns the new deadline when this failure starts a
    /// cooldown. Failures during an active cooldown leave its deadline alone.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures < self.max_consecutive_failures
            || self.active_until(now).is_some()
        {
            return None;
        }
        let until = chrono::Duration::from_std(Duration::from_secs(self.window_seconds))
            .ok()
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.cooldown_until = Some(until);
        Some(until)
    }
}
