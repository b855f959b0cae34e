//! Status values published once per cycle.

use crate::direction::Direction;
use crate::fusion::FusionPolicy;

/// Detection regime of one sensor, derived from its evidence, its motion
/// flag and its confirmed direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Nothing seen yet, or the object is out of range with no evidence.
    #[default]
    Idle,
    /// Readings are falling while still beyond the detection threshold.
    GradualApproach,
    /// Object appeared inside the zone without prior approach.
    SuddenAppearanceCandidate,
    /// Motion reported.
    Confirmed,
    /// Confirmed receding; evidence has been dropped.
    Leaving,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::GradualApproach => "gradual_approach",
            Phase::SuddenAppearanceCandidate => "sudden_appearance",
            Phase::Confirmed => "confirmed",
            Phase::Leaving => "leaving",
        }
    }
}

/// Last notable thing a detector reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MotionEvent {
    #[default]
    None,
    /// Motion flag rose.
    Detected,
    /// Motion flag fell.
    Cleared,
    /// Confirmed direction changed to approaching.
    Approaching,
    /// Confirmed direction changed to receding.
    Receding,
}

impl MotionEvent {
    pub fn name(self) -> &'static str {
        match self {
            MotionEvent::None => "none",
            MotionEvent::Detected => "detected",
            MotionEvent::Cleared => "cleared",
            MotionEvent::Approaching => "approaching",
            MotionEvent::Receding => "receding",
        }
    }
}

/// One sensor's view of the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerSensorStatus {
    pub slot: usize,
    /// Unsmoothed reading; `None` when absent or outside the sensor range.
    pub raw_distance_mm: Option<u32>,
    /// Window average used by all trigger logic.
    pub filtered_distance_mm: u32,
    pub motion_detected: bool,
    /// Noise-immune movement signal of this cycle (diagnostic).
    pub movement_detected: bool,
    /// Confirmed (debounced) direction.
    pub direction: Direction,
    pub phase: Phase,
    pub window_filled: bool,
    pub observed_at_ms: u64,
}

/// Fused view over all participating slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinedStatus {
    pub policy: FusionPolicy,
    /// Policy-selected decision; this is what drives alerting.
    pub motion_detected: bool,
    pub any_motion_detected: bool,
    pub all_motion_detected: bool,
    pub active_sensor_count: usize,
    pub detecting_sensor_count: usize,
    /// `None` when no slot participated this cycle.
    pub nearest_distance_mm: Option<u32>,
    pub primary_direction: Direction,
    pub combined_event_count: u32,
    pub updated_at_ms: u64,
}

impl CombinedStatus {
    pub fn idle(policy: FusionPolicy) -> Self {
        Self {
            policy,
            motion_detected: false,
            any_motion_detected: false,
            all_motion_detected: false,
            active_sensor_count: 0,
            detecting_sensor_count: 0,
            nearest_distance_mm: None,
            primary_direction: Direction::Stationary,
            combined_event_count: 0,
            updated_at_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Rising,
    Falling,
}

/// Counts false-to-true transitions of a boolean level.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeCounter {
    level: bool,
    rising: u32,
}

impl EdgeCounter {
    pub fn observe(&mut self, level: bool) -> Edge {
        let edge = match (self.level, level) {
            (false, true) => {
                self.rising = self.rising.saturating_add(1);
                Edge::Rising
            }
            (true, false) => Edge::Falling,
            _ => Edge::None,
        };
        self.level = level;
        edge
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.rising
    }

    #[inline]
    pub fn level(&self) -> bool {
        self.level
    }

    /// Zero the count; the current level is kept so a held level does not
    /// count again.
    pub fn reset_count(&mut self) {
        self.rising = 0;
    }

    /// Forget the level too.
    pub fn clear(&mut self) {
        self.level = false;
    }
}
