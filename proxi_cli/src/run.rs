//! `run`: the fusion engine on the configured sensors.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::Result;
use proxi_config::Config;
use proxi_core::{RunParams, RunSummary, runner};
use proxi_traits::clock::{Clock, ManualClock, MonotonicClock};

use crate::report::{cycle_line, summary_line};
use crate::sources::{build_manager, build_sequence};

#[derive(Debug, Clone, Copy)]
pub struct RunOpts {
    pub cycles: Option<u64>,
    pub virtual_time: bool,
    pub changes_only: bool,
    pub json: bool,
}

pub fn run_engine(cfg: &Config, opts: RunOpts, shutdown: &Arc<AtomicBool>) -> Result<RunSummary> {
    let max_cycles = opts.cycles.unwrap_or(cfg.runner.max_cycles);
    let params = RunParams {
        cycle_ms: cfg.cycle_ms(),
        max_cycles: (max_cycles > 0).then_some(max_cycles),
    };
    if opts.virtual_time {
        if cfg.runner.threaded {
            eyre::bail!("runner.threaded cannot be combined with --virtual-time");
        }
        drive(cfg, &ManualClock::new(), params, opts, shutdown)
    } else {
        drive(cfg, &MonotonicClock::new(), params, opts, shutdown)
    }
}

fn drive<C>(
    cfg: &Config,
    clock: &C,
    params: RunParams,
    opts: RunOpts,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    C: Clock + Clone + Send + Sync + 'static,
{
    let mut manager = build_manager(cfg, clock)?;
    let mut sequence = build_sequence(cfg)?;
    if !manager.all_ready() {
        tracing::info!("some sensors are still warming up; they join once ready");
    }

    let mut out = std::io::stdout().lock();
    let mut last_decision: Option<bool> = None;
    let summary = runner::run(&mut manager, clock, params, shutdown, |cycle| {
        let state = sequence.as_mut().map(|seq| {
            let zones = *seq.config();
            let motion = |slot: usize| {
                cycle
                    .statuses
                    .get(slot)
                    .copied()
                    .flatten()
                    .is_some_and(|s| s.motion_detected)
            };
            seq.update(motion(zones.far_slot), motion(zones.near_slot), cycle.now_ms)
        });
        let decision = cycle.combined.motion_detected;
        if !opts.changes_only || last_decision != Some(decision) {
            writeln!(out, "{}", cycle_line(cycle, state, opts.json))?;
        }
        last_decision = Some(decision);
        Ok(())
    })?;

    let approaches = sequence.as_ref().map(proxi_core::ApproachSequence::approaching_count);
    writeln!(out, "{}", summary_line(&summary, approaches, opts.json))?;
    Ok(summary)
}
