// ⏳ Time-windowed memoization
// Single-entry cache holding (fetched_at, value). Time comes from an injected clock.

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Holds at most one value, valid for `ttl` after it was stored.
///
/// There is no invalidation: an entry is only replaced when a read finds it
/// expired.
pub struct TtlCache<T> {
    ttl: Duration,
    clock: Box<dyn Clock>,
    entry: Option<(DateTime<Utc>, T)>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Box::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Box<dyn Clock>) -> Self {
        TtlCache {
            ttl,
            clock,
            entry: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value if it is still inside the window.
    pub fn get(&self) -> Option<&T> {
        let now = self.clock.now();
        match &self.entry {
            Some((stored_at, value)) if now - *stored_at < self.ttl => Some(value),
            _ => None,
        }
    }

    /// Return the cached value, or compute, store and return a fresh one.
    pub fn get_or_refresh<F>(&mut self, refresh: F) -> T
    where
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get() {
            tracing::debug!("cache hit");
            return value.clone();
        }

        tracing::debug!(ttl_secs = self.ttl.num_seconds(), "cache miss, refreshing");
        let value = refresh();
        self.entry = Some((self.clock.now(), value.clone()));
        value
    }
}

// ============================================================================
// TEST SUPPORT
// ============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Clock that only moves when told to.
    #[derive(Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            let start = DateTime::parse_from_rfc3339("2024-12-16T09:00:00Z")
                .unwrap()
                .with_timezone(&Utc);
            ManualClock {
                now: Arc::new(Mutex::new(start)),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}
