use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// Injected time source.
///
/// Every component that makes scheduling or deferral decisions takes a
/// `Clock` instead of reading `Utc::now()` directly, so tests can drive
/// quiet-hours windows and cadence deferrals deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    current: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.write().unwrap() = instant;
    }

    pub fn advance(&self, delta: Duration) {
        let mut current = self.current.write().unwrap();
        *current += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap()
    }
}
