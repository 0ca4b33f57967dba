use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Counter {
    session: u64,
    value: u64,
}

/// Total wave count reported by the contract. Never decreases within a
/// session; `reset` zeroes it and starts a new session.
#[derive(Debug, Default)]
pub struct TotalCount(Mutex<Counter>);

impl TotalCount {
    fn counter(&self) -> MutexGuard<'_, Counter> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> u64 {
        self.counter().value
    }

    pub fn session(&self) -> u64 {
        self.counter().session
    }

    /// Records a read taken during `session` and returns the value now held.
    /// `None` when that session has already ended; the read is discarded.
    pub fn observe(&self, session: u64, count: u64) -> Option<u64> {
        let mut counter = self.counter();
        if counter.session != session {
            return None;
        }
        counter.value = counter.value.max(count);
        Some(counter.value)
    }

    pub fn reset(&self) {
        let mut counter = self.counter();
        counter.session += 1;
        counter.value = 0;
    }
}
