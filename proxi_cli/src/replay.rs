//! `replay`: one detector over a recorded trace, sample by sample.

use std::io::Write;
use std::path::Path;

use eyre::{Result, WrapErr};
use proxi_config::Config;
use proxi_core::{PerSensorDetector, SensorConfig};
use proxi_hardware::{TraceSource, replay_of};
use proxi_traits::clock::ManualClock;
use proxi_traits::{RangeSource, RawSample};
use serde_json::json;

use crate::report::{sensor_json, sensor_text};
use crate::sources::{capabilities_for, load_trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub samples: usize,
    pub events: u32,
}

pub fn replay_trace(cfg: &Config, trace: &Path, slot: Option<usize>, json: bool) -> Result<ReplaySummary> {
    let sensor = match slot {
        Some(n) => cfg
            .sensor(n)
            .ok_or_else(|| eyre::eyre!("replay: no [[sensors]] entry for slot {n}"))?,
        None => cfg
            .primary()
            .or_else(|| cfg.sensors.first())
            .ok_or_else(|| eyre::eyre!("sensors: at least one [[sensors]] entry is required"))?,
    };
    let samples = load_trace(sensor, trace)?;
    let times: Vec<u64> = samples.iter().map(|s| s.t_ms).collect();

    let clock = ManualClock::new();
    let mut source = TraceSource::new(samples, replay_of(capabilities_for(sensor)), clock.clone());
    let mut detector = PerSensorDetector::new(SensorConfig::from(sensor))
        .wrap_err_with(|| format!("sensors[slot={}]", sensor.slot))?
        .with_slot(sensor.slot);
    tracing::info!(slot = sensor.slot, rows = times.len(), "replay start");

    let mut out = std::io::stdout().lock();
    for &t_ms in &times {
        clock.set_ms(t_ms);
        let reading = source
            .poll()
            .map_err(|e| eyre::eyre!("trace source failed: {e}"))?;
        let status = detector.update(RawSample::new(reading, t_ms));
        let line = if json {
            sensor_json(&status).to_string()
        } else {
            format!("[{t_ms:>7} ms] {}", sensor_text(&status))
        };
        writeln!(out, "{line}")?;
    }

    let summary = ReplaySummary {
        samples: times.len(),
        events: detector.event_count(),
    };
    if json {
        writeln!(
            out,
            "{}",
            json!({ "summary": { "samples": summary.samples, "events": summary.events } })
        )?;
    } else {
        writeln!(
            out,
            "Replay complete: {} samples, {} motion events",
            summary.samples, summary.events
        )?;
    }
    Ok(summary)
}
