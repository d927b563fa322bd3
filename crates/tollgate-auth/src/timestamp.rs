//! Request timestamp validation.
//!
//! A request carries its creation time as integer milliseconds since the Unix
//! epoch. It is accepted when it lies within a symmetric window around the
//! server's clock, which tolerates skew in both directions.

use std::time::Duration;

use chrono::Utc;

use crate::error::{AuthError, Result};

/// Checks request timestamps against a tolerance window.
#[derive(Debug, Clone, Copy)]
pub struct TimestampValidator {
    default_window: Duration,
}

impl TimestampValidator {
    /// Create a validator that applies `default_window` when callers pass zero.
    #[must_use]
    pub const fn new(default_window: Duration) -> Self {
        Self { default_window }
    }

    /// The window applied when none is given.
    #[must_use]
    pub const fn default_window(&self) -> Duration {
        self.default_window
    }

    /// Validate `timestamp` against the current time.
    ///
    /// A zero `window` selects the default window.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidFormat` if the timestamp is not an integer,
    /// or `AuthError::OutOfWindow` if it is too far from now.
    pub fn validate(&self, timestamp: &str, window: Duration) -> Result<()> {
        self.validate_at(timestamp, window, Utc::now().timestamp_millis())
    }

    /// Validate `timestamp` against an explicit `now_ms`.
    ///
    /// # Errors
    ///
    /// See [`TimestampValidator::validate`].
    pub fn validate_at(&self, timestamp: &str, window: Duration, now_ms: i64) -> Result<()> {
        let ts: i64 = timestamp.parse().map_err(|_| {
            AuthError::InvalidFormat(format!("timestamp {timestamp:?} is not integer milliseconds"))
        })?;

        let window = if window.is_zero() {
            self.default_window
        } else {
            window
        };
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);

        let skew_ms = now_ms.saturating_sub(ts);
        if skew_ms < -window_ms || skew_ms > window_ms {
            return Err(AuthError::OutOfWindow { skew_ms, window_ms });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;
    const WINDOW: Duration = Duration::from_secs(60);

    fn validator() -> TimestampValidator {
        TimestampValidator::new(WINDOW)
    }

    #[test]
    fn window_edges_are_inclusive() {
        let v = validator();
        assert!(v.validate_at(&(NOW - 60_000).to_string(), WINDOW, NOW).is_ok());
        assert!(v.validate_at(&(NOW + 60_000).to_string(), WINDOW, NOW).is_ok());
        assert!(v.validate_at(&NOW.to_string(), WINDOW, NOW).is_ok());
    }

    #[test]
    fn one_millisecond_past_either_edge_is_rejected() {
        let v = validator();
        let past = v.validate_at(&(NOW - 60_001).to_string(), WINDOW, NOW);
        assert!(matches!(
            past,
            Err(AuthError::OutOfWindow {
                skew_ms: 60_001,
                ..
            })
        ));

        let future = v.validate_at(&(NOW + 60_001).to_string(), WINDOW, NOW);
        assert!(matches!(
            future,
            Err(AuthError::OutOfWindow {
                skew_ms: -60_001,
                ..
            })
        ));
    }

    #[test]
    fn zero_window_uses_default() {
        let v = TimestampValidator::new(Duration::from_secs(5));
        assert!(v.validate_at(&(NOW - 5_000).to_string(), Duration::ZERO, NOW).is_ok());
        assert!(v.validate_at(&(NOW - 5_001).to_string(), Duration::ZERO, NOW).is_err());
    }

    #[test]
    fn explicit_window_overrides_default() {
        let v = validator();
        let ts = (NOW - 10_000).to_string();
        assert!(v.validate_at(&ts, Duration::from_secs(5), NOW).is_err());
    }

    #[test]
    fn malformed_timestamps() {
        let v = validator();
        for bad in ["", "abc", "12.5", " 1700000000000", "1e12"] {
            let result = v.validate_at(bad, WINDOW, NOW);
            assert!(
                matches!(result, Err(AuthError::InvalidFormat(_))),
                "{bad:?} should be rejected as malformed"
            );
        }
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        let v = validator();
        assert!(v.validate_at(&i64::MIN.to_string(), WINDOW, NOW).is_err());
        assert!(v.validate_at(&i64::MAX.to_string(), WINDOW, NOW).is_err());
    }

    #[test]
    fn current_time_is_accepted() {
        let now = Utc::now().timestamp_millis().to_string();
        assert!(validator().validate(&now, Duration::ZERO).is_ok());
    }
}
