//! Per-sensor filtering and dual-mode trigger.
//!
//! Each update feeds exactly one value into the rolling window (absent
//! readings become the max-range sentinel), derives a noise-immune movement
//! signal from the change in the window average, tracks approach evidence,
//! debounces direction, and decides whether this sensor reports motion.
//!
//! Two trigger rules exist. An object first seen approaching from beyond the
//! threshold (gradual) must keep showing movement while approaching inside
//! the zone. An object that shows up already inside the zone (sudden) only
//! needs a confirmed approaching direction, produced after it appeared.
//! A confirmed receding direction drops all evidence. Sensors configured to
//! also trigger on leaving report consistent receding movement in range.

use proxi_traits::RawSample;
use tracing::{debug, trace};

use crate::config::{
    LARGE_JUMP_MM, MOVEMENT_THRESHOLD_MM, SPREAD_CONSISTENCY_MM, SUDDEN_APPEARANCE_SAMPLES,
    SensorConfig,
};
use crate::direction::{Direction, DirectionTracker};
use crate::error::EngineError;
use crate::status::{Edge, EdgeCounter, MotionEvent, Phase, PerSensorStatus};
use crate::window::RollingWindow;

/// Accumulated approach evidence. Selects which trigger rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Evidence {
    #[default]
    None,
    /// Raw readings fell while the filtered distance was beyond threshold.
    Gradual,
    /// Object appeared in range with no prior approach.
    Sudden { awaiting_confirmation: bool },
}

/// Noise-immune movement test on the change of the window average.
#[inline]
pub fn movement_detected(delta_mm: u64, spread_mm: u32) -> bool {
    (delta_mm >= u64::from(MOVEMENT_THRESHOLD_MM) && spread_mm < SPREAD_CONSISTENCY_MM)
        || delta_mm >= u64::from(LARGE_JUMP_MM)
}

#[derive(Debug, Clone)]
pub struct PerSensorDetector {
    slot: usize,
    config: SensorConfig,
    window: RollingWindow,
    direction: DirectionTracker,
    evidence: Evidence,
    in_range_count: u8,
    prev_filtered: Option<u32>,
    prev_raw: Option<u32>,
    motion: EdgeCounter,
    last_event: MotionEvent,
    last_event_ms: Option<u64>,
    last_status: Option<PerSensorStatus>,
}

impl PerSensorDetector {
    pub fn new(config: SensorConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            slot: 0,
            config,
            window: RollingWindow::new(config.sample_window_size)?,
            direction: DirectionTracker::new(config.poll_interval_ms),
            evidence: Evidence::None,
            in_range_count: 0,
            prev_filtered: None,
            prev_raw: None,
            motion: EdgeCounter::default(),
            last_event: MotionEvent::None,
            last_event_ms: None,
            last_status: None,
        })
    }

    /// Tag published statuses with a slot index.
    #[must_use]
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = slot;
        self
    }

    /// Process one raw sample and publish this cycle's status.
    pub fn update(&mut self, sample: RawSample) -> PerSensorStatus {
        let cfg = self.config;
        let raw = sample.value.distance_mm().and_then(|mm| cfg.accept(mm));

        // Always insert; skipping an absent cycle would let a stale close
        // reading linger after the object left.
        self.window.insert(raw.unwrap_or(cfg.max_range_mm));
        if let (Some(limit), Some(v)) = (cfg.rebase_spread_mm, raw)
            && self.window.spread() >= limit
        {
            debug!(slot = self.slot, value_mm = v, limit_mm = limit, "window rebase");
            self.window.reset(Some(v));
        }

        let filtered = self.window.average().unwrap_or(cfg.max_range_mm);
        let spread = self.window.spread();
        let delta = if self.window.is_filled() {
            self.prev_filtered
                .map(|prev| i64::from(filtered) - i64::from(prev))
        } else {
            None
        };
        let movement = delta.is_some_and(|d| movement_detected(d.unsigned_abs(), spread));
        let in_range = cfg.in_range(filtered);

        let before = self.direction.confirmed();
        let motion = if cfg.direction_detection_enabled {
            let appeared = self.track_evidence(raw, filtered, in_range);
            if let Some(d) = delta {
                self.observe_direction(
                    Direction::from_delta(d, cfg.direction_sensitivity_mm),
                    appeared,
                );
            }
            let confirmed = self.direction.confirmed();
            let approach = match self.evidence {
                Evidence::Gradual => in_range && movement && confirmed == Direction::Approaching,
                Evidence::Sudden {
                    awaiting_confirmation: false,
                } => in_range && confirmed == Direction::Approaching,
                _ => false,
            };
            // Leaving needs no evidence, only consistent movement away.
            let leaving = in_range && movement && confirmed == Direction::Receding;
            let trigger = cfg.trigger_direction;
            let motion = (trigger.accepts(Direction::Approaching) && approach)
                || (trigger.accepts(Direction::Receding) && leaving);
            if confirmed == Direction::Receding && self.evidence != Evidence::None {
                debug!(slot = self.slot, evidence = ?self.evidence, "receding confirmed; evidence cleared");
                self.evidence = Evidence::None;
            }
            motion
        } else {
            in_range
        };

        let confirmed = self.direction.confirmed();
        self.record_events(before, confirmed, motion, sample.observed_at_ms);

        trace!(
            slot = self.slot,
            raw_mm = ?raw,
            filtered_mm = filtered,
            spread_mm = spread,
            movement,
            motion,
            direction = %confirmed,
            "detector update"
        );

        let status = PerSensorStatus {
            slot: self.slot,
            raw_distance_mm: raw,
            filtered_distance_mm: filtered,
            motion_detected: motion,
            movement_detected: movement,
            direction: confirmed,
            phase: self.phase(motion),
            window_filled: self.window.is_filled(),
            observed_at_ms: sample.observed_at_ms,
        };
        self.prev_filtered = Some(filtered);
        self.prev_raw = raw;
        self.last_status = Some(status);
        status
    }

    /// Returns true when this cycle marked a sudden appearance.
    fn track_evidence(&mut self, raw: Option<u32>, filtered: u32, in_range: bool) -> bool {
        let cfg = self.config;

        // Gradual approach is judged on raw samples: no smoothing lag.
        if let (Some(now), Some(prev)) = (raw, self.prev_raw)
            && prev.saturating_sub(now) >= cfg.direction_sensitivity_mm.max(1)
            && filtered > cfg.detection_threshold_mm
            && self.evidence != Evidence::Gradual
        {
            debug!(slot = self.slot, raw_mm = now, filtered_mm = filtered, "gradual approach");
            self.evidence = Evidence::Gradual;
        }

        if in_range {
            self.in_range_count = self.in_range_count.saturating_add(1);
        } else {
            self.in_range_count = 0;
        }
        // Also re-arms an object that backed off without leaving the zone,
        // once its receding direction has been superseded.
        if self.in_range_count >= SUDDEN_APPEARANCE_SAMPLES
            && self.evidence == Evidence::None
            && self.direction.confirmed() != Direction::Receding
        {
            debug!(slot = self.slot, filtered_mm = filtered, "sudden appearance");
            self.evidence = Evidence::Sudden {
                awaiting_confirmation: true,
            };
            return true;
        }
        false
    }

    /// A confirmation only counts for a sudden appearance from the cycle
    /// after it was marked.
    fn observe_direction(&mut self, candidate: Direction, appeared: bool) {
        if self.direction.observe(candidate).is_some()
            && !appeared
            && self.evidence
                == (Evidence::Sudden {
                    awaiting_confirmation: true,
                })
        {
            self.evidence = Evidence::Sudden {
                awaiting_confirmation: false,
            };
        }
    }

    fn record_events(&mut self, before: Direction, after: Direction, motion: bool, at_ms: u64) {
        if before != after {
            let event = match after {
                Direction::Approaching => Some(MotionEvent::Approaching),
                Direction::Receding => Some(MotionEvent::Receding),
                Direction::Stationary => None,
            };
            if let Some(event) = event {
                self.last_event = event;
                self.last_event_ms = Some(at_ms);
            }
        }
        match self.motion.observe(motion) {
            Edge::Rising => {
                debug!(slot = self.slot, events = self.motion.count(), "motion detected");
                self.last_event = MotionEvent::Detected;
                self.last_event_ms = Some(at_ms);
            }
            Edge::Falling => {
                self.last_event = MotionEvent::Cleared;
                self.last_event_ms = Some(at_ms);
            }
            Edge::None => {}
        }
    }

    fn phase(&self, motion: bool) -> Phase {
        if self.direction.confirmed() == Direction::Receding {
            return Phase::Leaving;
        }
        if motion {
            return Phase::Confirmed;
        }
        match self.evidence {
            Evidence::None => Phase::Idle,
            Evidence::Gradual => Phase::GradualApproach,
            Evidence::Sudden { .. } => Phase::SuddenAppearanceCandidate,
        }
    }

    /// Change the window capacity. A changed size discards the window and
    /// all evidence and direction state; the same size is a no-op.
    pub fn set_sample_window_size(&mut self, size: u8) -> Result<(), EngineError> {
        let next = SensorConfig {
            sample_window_size: size,
            ..self.config
        };
        next.validate()?;
        if size == self.config.sample_window_size {
            return Ok(());
        }
        self.window.resize(size)?;
        self.config = next;
        self.reset();
        debug!(slot = self.slot, size, "sample window resized");
        Ok(())
    }

    pub fn set_detection_threshold(&mut self, threshold_mm: u32) -> Result<(), EngineError> {
        self.reconfigure(SensorConfig {
            detection_threshold_mm: threshold_mm,
            ..self.config
        })
    }

    /// Replace the whole configuration and start from a clean window.
    pub fn reconfigure(&mut self, config: SensorConfig) -> Result<(), EngineError> {
        config.validate()?;
        let window = RollingWindow::new(config.sample_window_size)?;
        self.config = config;
        self.window = window;
        self.direction = DirectionTracker::new(config.poll_interval_ms);
        self.reset();
        debug!(slot = self.slot, ?config, "detector reconfigured");
        Ok(())
    }

    /// Drop window contents, evidence and direction; event counters survive.
    pub fn reset(&mut self) {
        self.window.reset(None);
        self.direction.reset();
        self.evidence = Evidence::None;
        self.in_range_count = 0;
        self.prev_filtered = None;
        self.prev_raw = None;
        self.motion.clear();
        self.last_status = None;
    }

    pub fn reset_events(&mut self) {
        self.motion.reset_count();
        self.last_event = MotionEvent::None;
        self.last_event_ms = None;
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    #[inline]
    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    #[inline]
    pub fn evidence(&self) -> Evidence {
        self.evidence
    }

    #[inline]
    pub fn confirmed_direction(&self) -> Direction {
        self.direction.confirmed()
    }

    #[inline]
    pub fn direction_tracker(&self) -> &DirectionTracker {
        &self.direction
    }

    #[inline]
    pub fn in_range_count(&self) -> u8 {
        self.in_range_count
    }

    #[inline]
    pub fn event_count(&self) -> u32 {
        self.motion.count()
    }

    #[inline]
    pub fn last_event(&self) -> MotionEvent {
        self.last_event
    }

    #[inline]
    pub fn last_event_ms(&self) -> Option<u64> {
        self.last_event_ms
    }

    #[inline]
    pub fn last_status(&self) -> Option<&PerSensorStatus> {
        self.last_status.as_ref()
    }
}
