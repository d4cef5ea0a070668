//! Clock primitive used to stamp purchases and check refund deadlines

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::{error::StorefrontError, EscrowResult};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for replays and tests; it never moves backwards
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward, returning the new time
    pub fn advance(&self, by: Duration) -> EscrowResult<DateTime<Utc>> {
        if by < Duration::zero() {
            return Err(StorefrontError::invalid_argument(
                "Clock cannot be moved backwards",
            ));
        }

        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now
            .checked_add_signed(by)
            .ok_or_else(|| StorefrontError::invalid_argument("Clock overflow"))?;
        Ok(*now)
    }

    /// Jump to `at`, which must not be earlier than the current time
    pub fn set(&self, at: DateTime<Utc>) -> EscrowResult<()> {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if at < *now {
            return Err(StorefrontError::invalid_argument(format!(
                "Clock cannot move back from {} to {}",
                *now, at
            )));
        }
        *now = at;
        Ok(())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
