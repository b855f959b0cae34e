use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Time source for the engine cycle and background samplers.
///
/// `sleep` may be simulated; see [`ManualClock`].
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Real-time monotonic clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Clock whose time only moves when told to.
///
/// `sleep(d)` advances time by `d` without blocking, so a paced loop driven
/// by this clock runs as fast as the CPU allows. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset_us: Arc<AtomicU64>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_us: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, d: Duration) {
        let us = u64::try_from(d.as_micros()).unwrap_or(u64::MAX);
        // fetch_update never fails with a closure that always returns Some
        let _ = self
            .offset_us
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                Some(cur.saturating_add(us))
            });
    }

    /// Jump to an absolute time relative to the clock's origin.
    pub fn set_ms(&self, ms: u64) {
        self.offset_us
            .store(ms.saturating_mul(1000), Ordering::Relaxed);
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_micros(self.offset_us.load(Ordering::Relaxed))
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_on_demand() {
        let clock = ManualClock::new();
        let epoch = clock.origin();
        assert_eq!(clock.ms_since(epoch), 0);
        clock.sleep(Duration::from_millis(75));
        assert_eq!(clock.ms_since(epoch), 75);
        let shared = clock.clone();
        shared.set_ms(1_000);
        assert_eq!(clock.ms_since(epoch), 1_000);
    }

    #[test]
    fn monotonic_zero_sleep_returns() {
        let c = MonotonicClock::new();
        let t0 = c.now();
        c.sleep(Duration::ZERO);
        assert!(c.ms_since(t0) < 50);
    }
}
