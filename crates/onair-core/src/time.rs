//! Time utilities for onair
//!
//! Wall-clock helpers for values exchanged with external stores. Durations
//! measured inside the coordinator use `tokio::time::Instant` instead so
//! that tests can pause and advance time.

use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is set before the Unix epoch.
///
/// # Examples
/// ```
/// use onair_core::time::current_time_millis;
///
/// let now = current_time_millis();
/// assert!(now > 0);
/// ```
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_current_time_millis_is_positive() {
        assert!(current_time_millis() > 0);
    }

    #[test]
    fn test_current_time_millis_advances() {
        let before = current_time_millis();
        std::thread::sleep(Duration::from_millis(5));
        assert!(current_time_millis() >= before + 5);
    }
}
