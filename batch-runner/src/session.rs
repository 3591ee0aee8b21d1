use std::time::{Duration, Instant};
use tracing::debug;

use redpost_core::{CoreError, SafetySettings};

/// Fraction of the default delay used as random jitter, either way.
const JITTER_FRACTION: f64 = 0.25;

/// Per-run submission counters: total posts and session age, checked
/// before every live submission. Nothing persists across runs.
#[derive(Debug)]
pub struct SessionGuard {
    settings: SafetySettings,
    post_count: u32,
    started_at: Instant,
}

impl SessionGuard {
    pub fn new(settings: SafetySettings) -> Self {
        Self {
            settings,
            post_count: 0,
            started_at: Instant::now(),
        }
    }

    pub fn post_count(&self) -> u32 {
        self.post_count
    }

    pub fn check_limits(&self) -> Result<(), CoreError> {
        if self.post_count >= self.settings.max_posts_per_session {
            return Err(CoreError::SessionLimit {
                reason: format!(
                    "{} posts submitted this session (max {})",
                    self.post_count, self.settings.max_posts_per_session
                ),
            });
        }

        let age = self.started_at.elapsed();
        if age > self.settings.max_session_duration {
            return Err(CoreError::SessionLimit {
                reason: format!(
                    "session running for {}s (max {}s)",
                    age.as_secs(),
                    self.settings.max_session_duration.as_secs()
                ),
            });
        }

        Ok(())
    }

    /// Call after each successful live submission.
    pub fn record_post(&mut self) {
        self.post_count += 1;
        debug!(post_count = self.post_count, "recorded submission");
    }

    /// Delay before the next record. An explicit override is honored
    /// as-is (floored at 1s); otherwise the default delay gets ±25%
    /// jitter and is clamped to the configured bounds.
    pub fn next_delay(&self, override_secs: Option<u64>) -> Duration {
        match override_secs {
            Some(secs) => Duration::from_secs(secs.max(1)),
            None => {
                let base = self.settings.default_delay.as_secs_f64();
                let jitter = (fastrand::f64() * 2.0 - 1.0) * JITTER_FRACTION;
                let jittered = Duration::from_secs_f64((base * (1.0 + jitter)).max(0.0));
                jittered.clamp(self.settings.min_delay, self.settings.max_delay)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SafetySettings {
        SafetySettings::default()
    }

    #[test]
    fn override_is_honored_but_floored_at_one_second() {
        let guard = SessionGuard::new(settings());
        assert_eq!(guard.next_delay(Some(0)), Duration::from_secs(1));
        assert_eq!(guard.next_delay(Some(7)), Duration::from_secs(7));
        // Overrides are not clamped to max_delay; the user gets control.
        assert_eq!(guard.next_delay(Some(900)), Duration::from_secs(900));
    }

    #[test]
    fn default_delay_stays_within_configured_bounds() {
        let guard = SessionGuard::new(settings());
        for _ in 0..100 {
            let delay = guard.next_delay(None);
            assert!(delay >= guard.settings.min_delay, "delay {delay:?} below min");
            assert!(delay <= guard.settings.max_delay, "delay {delay:?} above max");
        }
    }

    #[test]
    fn post_count_ceiling_is_enforced() {
        let mut custom = settings();
        custom.max_posts_per_session = 2;
        let mut guard = SessionGuard::new(custom);

        assert!(guard.check_limits().is_ok());
        guard.record_post();
        assert!(guard.check_limits().is_ok());
        guard.record_post();

        let err = guard.check_limits().unwrap_err();
        assert!(matches!(err, CoreError::SessionLimit { .. }));
        assert!(err.to_string().contains("max 2"));
    }

    #[test]
    fn session_duration_ceiling_is_enforced() {
        let mut custom = settings();
        custom.max_session_duration = Duration::ZERO;
        let guard = SessionGuard::new(custom);

        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(
            guard.check_limits(),
            Err(CoreError::SessionLimit { .. })
        ));
    }
}
