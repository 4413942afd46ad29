//! Per-question countdown arithmetic.
//!
//! The free functions are pure: remaining time is always derived from a
//! deadline and the current instant, never from an accumulated counter, so a
//! restarted process computes the same value as one that never stopped.

use chrono::{DateTime, Utc};

/// Whole seconds left until `deadline`, floored and clamped at zero.
#[must_use]
pub fn remaining_secs(now: DateTime<Utc>, deadline: DateTime<Utc>) -> u64 {
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    u64::try_from(millis / 1_000).unwrap_or(0)
}

/// True once fewer than one whole second remains.
#[must_use]
pub fn has_expired(now: DateTime<Utc>, deadline: DateTime<Utc>) -> bool {
    remaining_secs(now, deadline) == 0
}

/// One evaluation of a bound countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    pub index: usize,
    pub remaining_secs: u64,
    /// Set on the single poll that observed the transition to zero.
    pub expired_now: bool,
}

/// Countdown bound to one question index.
///
/// `poll` reports the expiry edge exactly once. Later polls keep returning
/// `remaining_secs == 0` with `expired_now == false`. A watch is never
/// re-pointed at another index; build a new one instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownWatch {
    index: usize,
    deadline: DateTime<Utc>,
    fired: bool,
}

impl CountdownWatch {
    #[must_use]
    pub fn new(index: usize, deadline: DateTime<Utc>) -> Self {
        Self {
            index,
            deadline,
            fired: false,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Re-evaluate the countdown at `now`.
    pub fn poll(&mut self, now: DateTime<Utc>) -> CountdownTick {
        let remaining_secs = remaining_secs(now, self.deadline);
        let expired_now = remaining_secs == 0 && !self.fired;
        if expired_now {
            self.fired = true;
        }
        CountdownTick {
            index: self.index,
            remaining_secs,
            expired_now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn remaining_floors_partial_seconds() {
        let now = fixed_now();
        assert_eq!(remaining_secs(now, now + Duration::milliseconds(50_999)), 50);
        assert_eq!(remaining_secs(now, now + Duration::milliseconds(999)), 0);
        assert_eq!(remaining_secs(now, now + Duration::seconds(1)), 1);
    }

    #[test]
    fn remaining_is_zero_after_deadline() {
        let now = fixed_now();
        assert_eq!(remaining_secs(now, now - Duration::seconds(30)), 0);
        assert!(has_expired(now, now - Duration::seconds(30)));
        assert!(has_expired(now, now));
        assert!(!has_expired(now, now + Duration::seconds(2)));
    }

    #[test]
    fn watch_fires_exactly_once() {
        let start = fixed_now();
        let mut watch = CountdownWatch::new(2, start + Duration::seconds(3));

        let mut fired = 0;
        for step in 0..10 {
            let tick = watch.poll(start + Duration::seconds(step));
            assert_eq!(tick.index, 2);
            if tick.expired_now {
                fired += 1;
                assert_eq!(step, 3);
            }
        }

        assert_eq!(fired, 1);
        assert!(watch.has_fired());
    }

    #[test]
    fn watch_on_past_deadline_fires_on_first_poll() {
        let now = fixed_now();
        let mut watch = CountdownWatch::new(0, now - Duration::seconds(10));

        let first = watch.poll(now);
        assert!(first.expired_now);
        assert_eq!(first.remaining_secs, 0);

        let second = watch.poll(now + Duration::seconds(1));
        assert!(!second.expired_now);
    }
}
