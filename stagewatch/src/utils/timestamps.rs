//! Timestamp helpers shared by the monitor and the error handler.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// Format: `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`
///
/// # Examples
///
/// ```
/// use stagewatch::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Returns the non-negative wall-clock duration between two timestamps.
///
/// Clock skew that would produce a negative span yields `Duration::ZERO`.
#[must_use]
pub fn duration_between(start: Timestamp, end: Timestamp) -> Duration {
    (end - start).to_std().unwrap_or(Duration::ZERO)
}

/// Returns the wall-clock time elapsed since `start`.
#[must_use]
pub fn elapsed_since(start: Timestamp) -> Duration {
    duration_between(start, now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_duration_between_forward() {
        let start = now_utc();
        let end = start + TimeDelta::milliseconds(1500);
        assert_eq!(duration_between(start, end), Duration::from_millis(1500));
    }

    #[test]
    fn test_duration_between_negative_is_zero() {
        let start = now_utc();
        let end = start - TimeDelta::seconds(5);
        assert_eq!(duration_between(start, end), Duration::ZERO);
    }

    #[test]
    fn test_elapsed_since_past() {
        let start = now_utc() - TimeDelta::seconds(2);
        assert!(elapsed_since(start) >= Duration::from_secs(2));
    }
}
