//! Background range sampling.
//!
//! Spawns a thread that owns a `RangeSource`, polls it at its own pace and
//! publishes only the most recent `RawSample` through a one-slot channel.
//! [`SampledSource`] adapts the published value back into a `RangeSource`
//! so the poll-driven engine never touches the worker's state.
//!
//! Each `Sampler` spawns exactly one thread, joined when the `Sampler` is
//! dropped.
use crossbeam_channel as xch;
use proxi_traits::clock::Clock;
use proxi_traits::{Capabilities, RangeSource, RawSample, Reading, SourceError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::util::{effective_poll_ms, stale_limit_ms};

pub struct Sampler {
    rx: xch::Receiver<RawSample>,
    last_ok: Arc<AtomicU64>,
    ready: Arc<AtomicBool>,
    epoch: Instant,
    capabilities: Capabilities,
    interval_ms: u32,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    /// Start polling `source` every `interval_ms` (raised to the source's floor).
    pub fn spawn<S, C>(mut source: S, interval_ms: u32, clock: C) -> Self
    where
        S: RangeSource + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(1);
        // The worker keeps a receiver so it can drop an unread sample and
        // publish the newer one instead of blocking.
        let drain = rx.clone();
        let capabilities = source.capabilities();
        let interval_ms = effective_poll_ms(interval_ms, capabilities.min_poll_interval_ms);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let ready = Arc::new(AtomicBool::new(source.is_ready()));
        let ready_clone = ready.clone();
        let period = Duration::from_millis(u64::from(interval_ms));
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("sampler thread received shutdown signal");
                    break;
                }

                let is_ready = source.is_ready();
                ready_clone.store(is_ready, Ordering::Relaxed);
                if is_ready {
                    match source.poll() {
                        Ok(value) => {
                            let now = clock.ms_since(epoch);
                            publish(&tx, &drain, RawSample::new(value, now));
                            last_ok_clone.store(now, Ordering::Relaxed);
                        }
                        Err(e) => {
                            // The consumer decays to absent once samples go stale.
                            tracing::debug!(error = %e, "background poll failed");
                        }
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("sampler thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            ready,
            epoch,
            capabilities,
            interval_ms,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Most recent published sample, if one arrived since the last call.
    pub fn latest(&self) -> Option<RawSample> {
        self.rx.try_iter().last()
    }

    /// Milliseconds since the last successful poll, relative to this sampler's epoch.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    #[inline]
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// Replace whatever is waiting in the slot with `sample`.
///
/// The worker is the only producer, so after draining the slot is free.
fn publish(tx: &xch::Sender<RawSample>, drain: &xch::Receiver<RawSample>, sample: RawSample) {
    if let Err(xch::TrySendError::Full(sample)) = tx.try_send(sample) {
        let _ = drain.try_recv();
        let _ = tx.try_send(sample);
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The worker exits between polls, or after the current bounded poll.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("sampler thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "sampler thread panicked during shutdown");
                }
            }
        }
    }
}

/// A `RangeSource` view over a [`Sampler`].
///
/// `poll` never blocks: it returns the last published reading until that
/// reading is older than the stale limit, then `Absent`.
pub struct SampledSource<C: Clock> {
    sampler: Sampler,
    clock: C,
    last: Option<RawSample>,
    stale_after_ms: u64,
}

impl<C: Clock> SampledSource<C> {
    pub fn new(sampler: Sampler, clock: C) -> Self {
        let stale_after_ms = stale_limit_ms(sampler.interval_ms());
        Self {
            sampler,
            clock,
            last: None,
            stale_after_ms,
        }
    }

    #[must_use]
    pub fn with_stale_after_ms(mut self, ms: u64) -> Self {
        self.stale_after_ms = ms;
        self
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }
}

impl<C: Clock> RangeSource for SampledSource<C> {
    fn poll(&mut self) -> Result<Reading, SourceError> {
        if let Some(fresh) = self.sampler.latest() {
            self.last = Some(fresh);
        }
        let now = self.clock.ms_since(self.sampler.epoch());
        Ok(match self.last {
            Some(s) if now.saturating_sub(s.observed_at_ms) <= self.stale_after_ms => s.value,
            _ => Reading::Absent,
        })
    }

    fn is_ready(&self) -> bool {
        self.sampler.is_ready()
    }

    fn capabilities(&self) -> Capabilities {
        self.sampler.capabilities()
    }

    fn max_latency_ms(&self) -> u32 {
        0
    }
}
