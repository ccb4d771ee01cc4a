//! Change-suppression policy
//!
//! Decides whether a decoded value is republished given the previously
//! published value and the time elapsed since the last publish. A nonzero
//! suppression duration holds unchanged values back until the duration has
//! passed, after which they are republished as a heartbeat refresh.

use std::time::{Duration, Instant};

use crate::registry::Value;

/// Whether an unchanged value is due for a heartbeat republish
pub(crate) fn is_time_for_non_cov_update(
    last_update: Option<Instant>,
    suppress_duration: Duration,
) -> bool {
    if suppress_duration.is_zero() {
        return true;
    }
    let Some(last_update) = last_update else {
        return true;
    };
    last_update.elapsed() > suppress_duration
}

/// Whether a decoded value should be published
pub(crate) fn should_publish(
    new: &Value,
    previous: Option<&Value>,
    last_update: Option<Instant>,
    suppress_duration: Duration,
) -> bool {
    previous != Some(new) || is_time_for_non_cov_update(last_update, suppress_duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_always_publishes() {
        let v = Value::Number(1.0);
        let now = Instant::now();
        assert!(should_publish(&v, Some(&v), Some(now), Duration::ZERO));
    }

    #[test]
    fn first_publish_always_goes_through() {
        let v = Value::Number(1.0);
        assert!(should_publish(&v, None, None, Duration::from_secs(5)));
    }

    #[test]
    fn changed_value_publishes_despite_suppression() {
        let prev = Value::Number(1.0);
        let new = Value::Number(2.0);
        let now = Instant::now();
        assert!(should_publish(
            &new,
            Some(&prev),
            Some(now),
            Duration::from_secs(5)
        ));
    }

    #[test]
    fn unchanged_value_is_suppressed_within_duration() {
        let v = Value::Number(1.0);
        let now = Instant::now();
        assert!(!should_publish(
            &v,
            Some(&v),
            Some(now),
            Duration::from_millis(5000)
        ));
    }

    #[test]
    fn unchanged_value_publishes_after_duration_elapses() {
        let v = Value::Number(1.0);
        let stale = Instant::now() - Duration::from_millis(5001);
        assert!(should_publish(
            &v,
            Some(&v),
            Some(stale),
            Duration::from_millis(5000)
        ));
    }

    #[test]
    fn kind_change_counts_as_a_change() {
        let prev = Value::Bool(false);
        let new = Value::Bits(vec![false; 16]);
        let now = Instant::now();
        assert!(should_publish(
            &new,
            Some(&prev),
            Some(now),
            Duration::from_secs(60)
        ));
    }
}
