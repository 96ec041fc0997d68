use crate::models::types::UtcDateTime;

pub trait Clock: Send + Sync {
    fn now(&self) -> UtcDateTime;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock(parking_lot::Mutex<UtcDateTime>);

#[cfg(test)]
impl ManualClock {
    pub fn new(now: UtcDateTime) -> ManualClock {
        ManualClock(parking_lot::Mutex::new(now))
    }

    pub fn set(&self, now: UtcDateTime) {
        *self.0.lock() = now;
    }

    pub fn advance(&self, by: time::Duration) {
        let mut now = self.0.lock();
        *now = *now + by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> UtcDateTime {
        *self.0.lock()
    }
}
