//! Controllable clock for tests.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use sentra_core::clock::Clock;

/// A clock that only moves when told to.
pub struct FrozenClock {
    now: RwLock<DateTime<Utc>>,
}

impl FrozenClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write() = to;
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}
