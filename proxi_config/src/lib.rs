#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and range-trace parsing for the proximity engine.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Omitted sensor keys fall back to per-kind defaults (see [`KindDefaults`]).
//! - The trace CSV loader enforces headers and time ordering.
use std::collections::HashSet;
use std::path::PathBuf;

use serde::Deserialize;

/// Slots available to the fusion engine.
pub const MAX_SENSORS: usize = 4;

/// Range-trace CSV schema.
///
/// Expected headers:
/// t_ms,distance_mm
///
/// An empty distance is an absent reading:
/// t_ms,distance_mm
/// 0,3500
/// 75,
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TraceRow {
    pub t_ms: u64,
    pub distance_mm: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    #[default]
    Any,
    All,
    TriggerMeasure,
    Independent,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SensorKindCfg {
    #[default]
    Ultrasonic,
    UltrasonicGrove,
    Pir,
}

/// Confirmed directions that may raise a ranging sensor's motion flag.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerDirectionCfg {
    #[default]
    Approaching,
    Receding,
    Both,
}

/// Values a sensor entry inherits for every key it omits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDefaults {
    pub min_range_mm: u32,
    pub max_range_mm: u32,
    pub detection_threshold_mm: u32,
    pub direction_sensitivity_mm: u32,
    pub sample_window_size: u8,
    pub poll_interval_ms: u32,
    pub direction_detection: bool,
}

impl SensorKindCfg {
    pub fn defaults(self) -> KindDefaults {
        match self {
            SensorKindCfg::Ultrasonic => KindDefaults {
                min_range_mm: 20,
                max_range_mm: 4000,
                detection_threshold_mm: 1100,
                direction_sensitivity_mm: 20,
                sample_window_size: 5,
                poll_interval_ms: 75,
                direction_detection: true,
            },
            SensorKindCfg::UltrasonicGrove => KindDefaults {
                max_range_mm: 3500,
                ..SensorKindCfg::Ultrasonic.defaults()
            },
            SensorKindCfg::Pir => KindDefaults {
                min_range_mm: 0,
                max_range_mm: 7000,
                detection_threshold_mm: 5000,
                direction_sensitivity_mm: 20,
                sample_window_size: 3,
                poll_interval_ms: 100,
                direction_detection: false,
            },
        }
    }

    pub fn is_ranging(self) -> bool {
        !matches!(self, SensorKindCfg::Pir)
    }

    pub fn name(self) -> &'static str {
        match self {
            SensorKindCfg::Ultrasonic => "ultrasonic",
            SensorKindCfg::UltrasonicGrove => "ultrasonic_grove",
            SensorKindCfg::Pir => "pir",
        }
    }
}

/// GPIO wiring (BCM numbering). Only read with the `hardware` feature.
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct PinsCfg {
    /// Trigger output of a four-pin ultrasonic ranger.
    pub trigger: Option<u8>,
    /// Echo input of a four-pin ultrasonic ranger.
    pub echo: Option<u8>,
    /// Single-wire signal (three-pin ranger, or PIR output).
    pub signal: Option<u8>,
}

/// Simulated backend parameters.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SimCfg {
    /// Walk profile for ranging sensors: start, approach, hold, repeat.
    pub start_mm: u32,
    pub end_mm: u32,
    pub speed_mm_s: u32,
    pub hold_ms: u32,
    /// Uniform noise amplitude added to every reading.
    pub noise_mm: u32,
    pub seed: u64,
    /// Presence pattern for PIR sensors.
    pub active_ms: u32,
    pub idle_ms: u32,
    /// Overrides the device's power-up warm-up (PIR modules take a minute).
    pub warmup_ms: Option<u32>,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            start_mm: 3500,
            end_mm: 400,
            speed_mm_s: 1300,
            hold_ms: 1000,
            noise_mm: 10,
            seed: 0x5eed,
            active_ms: 3000,
            idle_ms: 5000,
            warmup_ms: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorCfg {
    pub slot: usize,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: SensorKindCfg,
    #[serde(default)]
    pub primary: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub min_range_mm: Option<u32>,
    pub max_range_mm: Option<u32>,
    pub detection_threshold_mm: Option<u32>,
    pub direction_sensitivity_mm: Option<u32>,
    pub sample_window_size: Option<u8>,
    pub poll_interval_ms: Option<u32>,
    pub direction_detection: Option<bool>,
    /// Reset the window when its spread reaches this many mm; absent disables.
    pub rebase_spread_mm: Option<u32>,
    /// approaching (default) | receding | both
    pub trigger_direction: Option<TriggerDirectionCfg>,
    /// Distance a presence sensor reports while active.
    pub presence_distance_mm: Option<u32>,
    /// Replay this CSV trace instead of the simulated walker.
    pub trace: Option<PathBuf>,
    pub pins: Option<PinsCfg>,
    #[serde(default)]
    pub sim: SimCfg,
}

const fn default_true() -> bool {
    true
}

impl SensorCfg {
    /// Entry with every optional key omitted.
    pub fn new(slot: usize, kind: SensorKindCfg) -> Self {
        Self {
            slot,
            name: None,
            kind,
            primary: false,
            enabled: true,
            min_range_mm: None,
            max_range_mm: None,
            detection_threshold_mm: None,
            direction_sensitivity_mm: None,
            sample_window_size: None,
            poll_interval_ms: None,
            direction_detection: None,
            rebase_spread_mm: None,
            trigger_direction: None,
            presence_distance_mm: None,
            trace: None,
            pins: None,
            sim: SimCfg::default(),
        }
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.kind.name(), self.slot))
    }

    pub fn min_range_mm(&self) -> u32 {
        self.min_range_mm
            .unwrap_or(self.kind.defaults().min_range_mm)
    }

    pub fn max_range_mm(&self) -> u32 {
        self.max_range_mm
            .unwrap_or(self.kind.defaults().max_range_mm)
    }

    pub fn detection_threshold_mm(&self) -> u32 {
        self.detection_threshold_mm
            .unwrap_or(self.kind.defaults().detection_threshold_mm)
    }

    pub fn direction_sensitivity_mm(&self) -> u32 {
        self.direction_sensitivity_mm
            .unwrap_or(self.kind.defaults().direction_sensitivity_mm)
    }

    pub fn sample_window_size(&self) -> u8 {
        self.sample_window_size
            .unwrap_or(self.kind.defaults().sample_window_size)
    }

    pub fn poll_interval_ms(&self) -> u32 {
        self.poll_interval_ms
            .unwrap_or(self.kind.defaults().poll_interval_ms)
    }

    pub fn direction_detection(&self) -> bool {
        self.direction_detection
            .unwrap_or(self.kind.defaults().direction_detection)
    }

    pub fn trigger_direction(&self) -> TriggerDirectionCfg {
        self.trigger_direction.unwrap_or_default()
    }

    pub fn presence_distance_mm(&self) -> u32 {
        self.presence_distance_mm.unwrap_or(1000)
    }

    fn validate(&self) -> eyre::Result<()> {
        let key = format!("sensors[slot={}]", self.slot);
        if self.slot >= MAX_SENSORS {
            eyre::bail!("{key}.slot must be in 0..={}", MAX_SENSORS - 1);
        }
        let (min, max) = (self.min_range_mm(), self.max_range_mm());
        if min >= max {
            eyre::bail!("{key}.min_range_mm ({min}) must be below max_range_mm ({max})");
        }
        let threshold = self.detection_threshold_mm();
        if self.kind.is_ranging() {
            if !(100..=5000).contains(&threshold) {
                eyre::bail!("{key}.detection_threshold_mm must be in 100..=5000");
            }
        } else if threshold == 0 {
            eyre::bail!("{key}.detection_threshold_mm must be >= 1");
        }
        if threshold > max {
            eyre::bail!("{key}.detection_threshold_mm must not exceed max_range_mm ({max})");
        }
        if self.direction_sensitivity_mm() > max {
            eyre::bail!("{key}.direction_sensitivity_mm must not exceed max_range_mm ({max})");
        }
        if !(3..=20).contains(&self.sample_window_size()) {
            eyre::bail!("{key}.sample_window_size must be in 3..=20");
        }
        if !(1..=10_000).contains(&self.poll_interval_ms()) {
            eyre::bail!("{key}.poll_interval_ms must be in 1..=10000");
        }
        if self.rebase_spread_mm == Some(0) {
            eyre::bail!("{key}.rebase_spread_mm must be >= 1 (omit it to disable)");
        }
        if !self.kind.is_ranging() {
            let p = self.presence_distance_mm();
            if p < min || p > threshold {
                eyre::bail!(
                    "{key}.presence_distance_mm must be in {min}..={threshold} so presence is in range"
                );
            }
        }
        if let Some(pins) = self.pins {
            match self.kind {
                SensorKindCfg::Ultrasonic => match (pins.trigger, pins.echo) {
                    (Some(t), Some(e)) if t == e => {
                        eyre::bail!("{key}.pins.trigger and pins.echo must differ");
                    }
                    (Some(_), Some(_)) => {}
                    _ => eyre::bail!("{key}.pins requires trigger and echo for kind ultrasonic"),
                },
                SensorKindCfg::UltrasonicGrove | SensorKindCfg::Pir => {
                    if pins.signal.is_none() {
                        eyre::bail!("{key}.pins requires signal for kind {}", self.kind.name());
                    }
                }
            }
        }
        if self.kind.is_ranging() && self.trace.is_none() && self.sim.speed_mm_s == 0 {
            eyre::bail!("{key}.sim.speed_mm_s must be > 0");
        }
        if !self.kind.is_ranging() && (self.sim.active_ms == 0 || self.sim.idle_ms == 0) {
            eyre::bail!("{key}.sim.active_ms and sim.idle_ms must be > 0");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct EngineCfg {
    pub policy: Policy,
    /// Slot that reports distance and direction under `trigger_measure`.
    pub measurement_slot: Option<usize>,
    /// Control-loop period; defaults to the fastest sensor's poll interval.
    pub cycle_ms: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct SequenceCfg {
    pub far_slot: usize,
    pub near_slot: usize,
    #[serde(default = "default_confirmation_window_ms")]
    pub confirmation_window_ms: u32,
    #[serde(default = "default_simultaneous_threshold_ms")]
    pub simultaneous_threshold_ms: u32,
    #[serde(default = "default_pattern_timeout_ms")]
    pub pattern_timeout_ms: u32,
}

const fn default_confirmation_window_ms() -> u32 {
    5000
}

const fn default_simultaneous_threshold_ms() -> u32 {
    500
}

const fn default_pattern_timeout_ms() -> u32 {
    10_000
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct RunnerCfg {
    /// Stop after this many cycles; 0 runs until interrupted.
    pub max_cycles: u64,
    /// Poll every source on its own background thread.
    pub threaded: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineCfg,
    #[serde(default)]
    pub sensors: Vec<SensorCfg>,
    /// Optional two-zone approach detector.
    #[serde(default)]
    pub sequence: Option<SequenceCfg>,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn sensor(&self, slot: usize) -> Option<&SensorCfg> {
        self.sensors.iter().find(|s| s.slot == slot)
    }

    pub fn primary(&self) -> Option<&SensorCfg> {
        self.sensors.iter().find(|s| s.primary)
    }

    /// Cycle period in use: the configured one, else the fastest enabled sensor.
    pub fn cycle_ms(&self) -> u32 {
        self.engine.cycle_ms.unwrap_or_else(|| {
            self.sensors
                .iter()
                .filter(|s| s.enabled)
                .map(SensorCfg::poll_interval_ms)
                .min()
                .unwrap_or(100)
        })
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Sensors
        if self.sensors.is_empty() {
            eyre::bail!("sensors: at least one [[sensors]] entry is required");
        }
        if self.sensors.len() > MAX_SENSORS {
            eyre::bail!("sensors: at most {MAX_SENSORS} entries are supported");
        }
        let mut seen = HashSet::new();
        for s in &self.sensors {
            s.validate()?;
            if !seen.insert(s.slot) {
                eyre::bail!("sensors: slot {} is configured twice", s.slot);
            }
        }
        let primaries = self.sensors.iter().filter(|s| s.primary).count();
        if primaries > 1 {
            eyre::bail!("sensors: only one sensor may be primary, found {primaries}");
        }

        // Engine
        if let Some(ms) = self.engine.cycle_ms
            && !(1..=10_000).contains(&ms)
        {
            eyre::bail!("engine.cycle_ms must be in 1..=10000");
        }
        if let Some(slot) = self.engine.measurement_slot {
            match self.sensor(slot) {
                None => eyre::bail!("engine.measurement_slot {slot} has no [[sensors]] entry"),
                Some(s) if s.primary => {
                    eyre::bail!("engine.measurement_slot must not be the primary sensor");
                }
                Some(_) => {}
            }
        }
        if self.engine.policy == Policy::TriggerMeasure {
            if primaries == 0 {
                eyre::bail!("engine.policy trigger_measure requires a primary sensor");
            }
            if self.sensors.iter().filter(|s| s.enabled).count() < 2 {
                eyre::bail!("engine.policy trigger_measure requires at least two enabled sensors");
            }
        }

        // Sequence
        if let Some(seq) = &self.sequence {
            for (key, slot) in [("far_slot", seq.far_slot), ("near_slot", seq.near_slot)] {
                if self.sensor(slot).is_none() {
                    eyre::bail!("sequence.{key} {slot} has no [[sensors]] entry");
                }
            }
            if seq.far_slot == seq.near_slot {
                eyre::bail!("sequence.far_slot and sequence.near_slot must differ");
            }
            if !(1000..=30_000).contains(&seq.confirmation_window_ms) {
                eyre::bail!("sequence.confirmation_window_ms must be in 1000..=30000");
            }
            if seq.simultaneous_threshold_ms > 2000 {
                eyre::bail!("sequence.simultaneous_threshold_ms must be <= 2000");
            }
            if seq.pattern_timeout_ms < seq.confirmation_window_ms {
                eyre::bail!("sequence.pattern_timeout_ms must be >= confirmation_window_ms");
            }
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["t_ms", "distance_mm"];
    let actual: Vec<String> = headers.iter().map(ToString::to_string).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 't_ms,distance_mm', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<TraceRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        if let Some(prev) = rows.last()
            && row.t_ms < prev.t_ms
        {
            eyre::bail!(
                "trace CSV row {}: t_ms {} goes backwards (previous {})",
                idx + 2,
                row.t_ms,
                prev.t_ms
            );
        }
        rows.push(row);
    }

    if rows.is_empty() {
        eyre::bail!("trace CSV {:?} has no samples", path);
    }
    Ok(rows)
}
