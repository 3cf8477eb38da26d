//! Process-wide `now()` capability, threaded explicitly instead of read from
//! a hidden global (spec §9 "cross-cutting clock").

use chrono::{DateTime, Utc};

/// Capability for obtaining the current time. Entities and use cases that
/// need "now" take a `&dyn Clock` (or a concrete `now` parameter derived
/// from one) rather than calling `Utc::now()` directly, so tests are
/// deterministic.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests: fixed unless advanced explicitly.
#[derive(Debug)]
pub struct FixedClock {
    inner: std::sync::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            inner: std::sync::Mutex::new(at),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.inner.lock().expect("FixedClock mutex poisoned");
        *guard += delta;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut guard = self.inner.lock().expect("FixedClock mutex poisoned");
        *guard = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.lock().expect("FixedClock mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_deterministically() {
        let base = "2025-01-15T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let clock = FixedClock::new(base);
        assert_eq!(clock.now(), base);
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(clock.now(), base + chrono::Duration::hours(2));
    }
}
