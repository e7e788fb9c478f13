//! A single-slot cache whose value expires after a fixed time-to-live.
//!
//! Used to bound reads of the shared store when many viewers load the
//! leaderboard at once. A stale value up to the TTL is served as-is.

use log::debug;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

struct CachedValue<T> {
    fetched_at: Instant,
    value: T,
}

pub struct TtlCache<T> {
    ttl: Duration,
    slot: Mutex<Option<CachedValue<T>>>,
}

impl<T: Clone> TtlCache<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value if it is younger than the TTL, otherwise call
    /// `fetch` and keep its result. A failed fetch leaves the slot untouched.
    /// The lock is held while fetching so concurrent misses hit the store once.
    ///
    /// # Errors
    /// Returns whatever error `fetch` returns.
    pub fn get_or_refresh<E, F>(&self, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = slot.as_ref()
            && cached.fetched_at.elapsed() < self.ttl
        {
            return Ok(cached.value.clone());
        }

        let value = fetch()?;
        debug!("Refreshed cached value (ttl {:?})", self.ttl);
        *slot = Some(CachedValue {
            fetched_at: Instant::now(),
            value: value.clone(),
        });
        Ok(value)
    }

    /// Drop the cached value so the next read fetches again.
    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
