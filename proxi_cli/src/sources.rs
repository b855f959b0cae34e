//! Turns the `[[sensors]]` table into range sources and a fusion manager.

use eyre::{Result, WrapErr};
use proxi_config::{Config, SensorCfg, SensorKindCfg};
use proxi_core::{ApproachSequence, BoxedSource, SampledSource, Sampler, SensorConfig, SensorFusionManager};
use proxi_hardware::{
    PIR, PresencePattern, SimulatedPir, SimulatedUltrasonic, TraceSample, TraceSource, ULTRASONIC,
    ULTRASONIC_GROVE, WalkProfile, replay_of,
};
use proxi_traits::clock::Clock;
use proxi_traits::{Capabilities, Reading};

/// Device capabilities narrowed to the configured range.
pub fn capabilities_for(s: &SensorCfg) -> Capabilities {
    let base = match s.kind {
        SensorKindCfg::Ultrasonic => ULTRASONIC,
        SensorKindCfg::UltrasonicGrove => ULTRASONIC_GROVE,
        SensorKindCfg::Pir => PIR,
    };
    Capabilities {
        min_range_mm: s.min_range_mm(),
        max_range_mm: s.max_range_mm(),
        ..base
    }
}

pub fn load_trace(s: &SensorCfg, path: &std::path::Path) -> Result<Vec<TraceSample>> {
    let rows = proxi_config::load_trace_csv(path)
        .wrap_err_with(|| format!("sensors[slot={}].trace", s.slot))?;
    Ok(rows
        .into_iter()
        .map(|r| TraceSample {
            t_ms: r.t_ms,
            reading: Reading::from(r.distance_mm),
        })
        .collect())
}

/// Open the source behind one sensor entry.
///
/// A trace wins over pins; pins are only honoured with the `hardware`
/// feature; otherwise the sensor is simulated.
pub fn open_source<C>(s: &SensorCfg, clock: &C) -> Result<BoxedSource>
where
    C: Clock + Clone + Send + 'static,
{
    let caps = capabilities_for(s);
    if let Some(path) = &s.trace {
        let samples = load_trace(s, path)?;
        tracing::debug!(slot = s.slot, rows = samples.len(), "replaying trace");
        return Ok(Box::new(TraceSource::new(samples, replay_of(caps), clock.clone())));
    }

    #[cfg(feature = "hardware")]
    {
        if let Some(pins) = s.pins {
            return open_hardware(s, pins, caps)
                .wrap_err_with(|| format!("open sensor pins for sensors[slot={}]", s.slot));
        }
    }

    let sim = &s.sim;
    let caps = Capabilities {
        warmup_ms: sim.warmup_ms.unwrap_or(caps.warmup_ms),
        ..caps
    };
    let source: BoxedSource = match s.kind {
        SensorKindCfg::Pir => Box::new(SimulatedPir::new(
            PresencePattern {
                idle_ms: sim.idle_ms,
                active_ms: sim.active_ms,
                presence_mm: s.presence_distance_mm(),
            },
            caps,
            clock.clone(),
        )),
        SensorKindCfg::Ultrasonic | SensorKindCfg::UltrasonicGrove => Box::new(SimulatedUltrasonic::new(
            WalkProfile {
                start_mm: sim.start_mm,
                end_mm: sim.end_mm,
                speed_mm_s: sim.speed_mm_s,
                hold_ms: sim.hold_ms,
                noise_mm: sim.noise_mm,
                // distinct noise per slot even with a shared seed
                seed: sim.seed ^ (s.slot as u64),
            },
            caps,
            clock.clone(),
        )),
    };
    Ok(source)
}

#[cfg(feature = "hardware")]
fn open_hardware(s: &SensorCfg, pins: proxi_config::PinsCfg, caps: Capabilities) -> Result<BoxedSource> {
    use proxi_hardware::{GpioPir, GroveUltrasonic, Hcsr04};

    let source: BoxedSource = match (s.kind, pins.trigger, pins.echo, pins.signal) {
        (SensorKindCfg::Ultrasonic, Some(trigger), Some(echo), _) => {
            Box::new(Hcsr04::new(trigger, echo, caps)?)
        }
        (SensorKindCfg::UltrasonicGrove, _, _, Some(signal)) => {
            Box::new(GroveUltrasonic::new(signal, caps)?)
        }
        (SensorKindCfg::Pir, _, _, Some(signal)) => {
            Box::new(GpioPir::new(signal, s.presence_distance_mm(), caps)?)
        }
        _ => eyre::bail!("pins are incomplete for kind {}", s.kind.name()),
    };
    tracing::info!(slot = s.slot, kind = s.kind.name(), "gpio sensor opened");
    Ok(source)
}

/// Every configured sensor paired with its opened source, in slot order.
pub fn open_all<'a, C>(cfg: &'a Config, clock: &C) -> Result<Vec<(&'a SensorCfg, BoxedSource)>>
where
    C: Clock + Clone + Send + Sync + 'static,
{
    let mut entries: Vec<&SensorCfg> = cfg.sensors.iter().collect();
    entries.sort_by_key(|s| s.slot);
    entries
        .into_iter()
        .map(|s| {
            let source = open_source(s, clock)?;
            let source: BoxedSource = if cfg.runner.threaded {
                let sampler = Sampler::spawn(source, s.poll_interval_ms(), clock.clone());
                Box::new(SampledSource::new(sampler, clock.clone()))
            } else {
                source
            };
            Ok((s, source))
        })
        .collect()
}

/// Install opened sources into a manager configured from `cfg`.
pub fn assemble(cfg: &Config, sources: Vec<(&SensorCfg, BoxedSource)>) -> Result<SensorFusionManager> {
    let mut manager = SensorFusionManager::new(cfg.engine.policy.into());
    for (s, source) in sources {
        manager.add_sensor(s.slot, SensorConfig::from(s), s.display_name(), s.primary, source)?;
        if !s.enabled {
            manager.set_enabled(s.slot, false)?;
        }
    }
    manager.set_measurement_slot(cfg.engine.measurement_slot)?;
    manager.validate_topology()?;
    Ok(manager)
}

pub fn build_manager<C>(cfg: &Config, clock: &C) -> Result<SensorFusionManager>
where
    C: Clock + Clone + Send + Sync + 'static,
{
    let sources = open_all(cfg, clock)?;
    assemble(cfg, sources)
}

pub fn build_sequence(cfg: &Config) -> Result<Option<ApproachSequence>> {
    cfg.sequence
        .as_ref()
        .map(|seq| ApproachSequence::new(seq.into()).map_err(eyre::Report::from))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxi_traits::clock::ManualClock;

    fn config(toml: &str) -> Config {
        let cfg = proxi_config::load_toml(toml).unwrap();
        cfg.validate().unwrap();
        cfg
    }

    #[test]
    fn capabilities_follow_configured_range() {
        let mut s = SensorCfg::new(0, SensorKindCfg::UltrasonicGrove);
        s.max_range_mm = Some(3000);
        let caps = capabilities_for(&s);
        assert_eq!(caps.max_range_mm, 3000);
        assert_eq!(caps.min_poll_interval_ms, ULTRASONIC_GROVE.min_poll_interval_ms);
    }

    #[test]
    fn manager_mirrors_the_sensor_table() {
        let cfg = config(
            r#"
[engine]
policy = "trigger_measure"
measurement_slot = 2

[[sensors]]
slot = 2
kind = "ultrasonic"

[[sensors]]
slot = 0
kind = "pir"
primary = true
[sensors.sim]
warmup_ms = 0

[[sensors]]
slot = 3
enabled = false
"#,
        );
        let clock = ManualClock::new();
        let m = build_manager(&cfg, &clock).unwrap();
        assert_eq!(m.sensor_count(), 3);
        assert_eq!(m.enabled_count(), 2);
        assert_eq!(m.primary_slot(), Some(0));
        assert_eq!(m.measurement_slot(), Some(2));
        assert!(m.all_ready());
        assert_eq!(m.slot(0).unwrap().name(), "pir-0");
    }

    #[test]
    fn pir_without_override_is_warming_up() {
        let cfg = config("[[sensors]]\nslot = 0\nkind = \"pir\"\n");
        let m = build_manager(&cfg, &ManualClock::new()).unwrap();
        assert!(!m.all_ready());
    }

    #[test]
    fn sequence_is_optional() {
        let cfg = config("[[sensors]]\nslot = 0\n");
        assert!(build_sequence(&cfg).unwrap().is_none());
    }
}
