//! Fixed-cadence driver around [`SensorFusionManager::update`].
//!
//! The runner owns nothing but the loop: callers hand in the manager, a
//! clock and a shutdown flag, and get a callback with every cycle's fused
//! and per-slot view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use proxi_traits::clock::Clock;
use tracing::{debug, info, warn};

use crate::config::MAX_POLL_INTERVAL_MS;
use crate::error::{EngineError, Result};
use crate::fusion::{MAX_SLOTS, SensorFusionManager};
use crate::status::{CombinedStatus, PerSensorStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    /// Engine cycle period. Slots slower than this are polled only when due.
    pub cycle_ms: u32,
    /// Stop after this many cycles; `None` runs until shutdown.
    pub max_cycles: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            cycle_ms: 50,
            max_cycles: None,
        }
    }
}

/// One engine cycle as seen by the callback.
#[derive(Debug, Clone, Copy)]
pub struct Cycle {
    pub index: u64,
    pub now_ms: u64,
    pub combined: CombinedStatus,
    pub statuses: [Option<PerSensorStatus>; MAX_SLOTS],
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub cycles: u64,
    /// Final combined event count.
    pub events: u32,
    /// Cycles whose work took longer than `cycle_ms`.
    pub overruns: u64,
    pub final_status: CombinedStatus,
}

/// Drive `manager` until `shutdown` is set or `max_cycles` is reached.
///
/// The topology is checked once up front. An error from `on_cycle` stops
/// the loop and is returned as is.
pub fn run<C, F>(
    manager: &mut SensorFusionManager,
    clock: &C,
    params: RunParams,
    shutdown: &AtomicBool,
    mut on_cycle: F,
) -> Result<RunSummary>
where
    C: Clock,
    F: FnMut(&Cycle) -> Result<()>,
{
    if params.cycle_ms == 0 || params.cycle_ms > MAX_POLL_INTERVAL_MS {
        return Err(EngineError::InvalidPollInterval(params.cycle_ms).into());
    }
    manager.validate_topology()?;

    let epoch = clock.now();
    let period = Duration::from_millis(u64::from(params.cycle_ms));
    let mut cycles: u64 = 0;
    let mut overruns: u64 = 0;

    info!(
        policy = manager.policy().name(),
        sensors = manager.sensor_count(),
        cycle_ms = params.cycle_ms,
        "engine start"
    );

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!(cycles, "shutdown requested");
            break;
        }
        if params.max_cycles.is_some_and(|max| cycles >= max) {
            break;
        }

        let started = clock.now();
        let now_ms = clock.ms_since(epoch);
        let combined = *manager.update(now_ms);
        let cycle = Cycle {
            index: cycles,
            now_ms,
            combined,
            statuses: manager.statuses(),
        };
        on_cycle(&cycle)?;
        cycles += 1;

        let spent = clock.now().saturating_duration_since(started);
        if let Some(rest) = period.checked_sub(spent) {
            clock.sleep(rest);
        } else {
            overruns += 1;
            warn!(
                cycle = cycle.index,
                spent_ms = spent.as_millis(),
                cycle_ms = params.cycle_ms,
                "engine cycle overran"
            );
        }
    }

    let final_status = *manager.combined();
    info!(
        cycles,
        events = final_status.combined_event_count,
        overruns,
        "engine stop"
    );
    Ok(RunSummary {
        cycles,
        events: final_status.combined_event_count,
        overruns,
        final_status,
    })
}
