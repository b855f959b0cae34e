//! Debounced direction of travel.
//!
//! Every filled cycle yields an instantaneous candidate from the change in
//! filtered distance. The reported direction only follows the candidate
//! after it has been seen for a fixed number of consecutive samples.

use crate::util::{DIRECTION_STABILITY_MS, stability_samples};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Distance decreasing.
    Approaching,
    /// Distance increasing.
    Receding,
    #[default]
    Stationary,
}

impl Direction {
    /// Classify a signed change in filtered distance (`new - old`).
    #[inline]
    pub fn from_delta(delta_mm: i64, sensitivity_mm: u32) -> Self {
        if delta_mm.unsigned_abs() < u64::from(sensitivity_mm) {
            Direction::Stationary
        } else if delta_mm < 0 {
            Direction::Approaching
        } else {
            Direction::Receding
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Approaching => "approaching",
            Direction::Receding => "receding",
            Direction::Stationary => "stationary",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which confirmed directions may raise a sensor's motion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriggerDirection {
    #[default]
    Approaching,
    Receding,
    Both,
}

impl TriggerDirection {
    #[inline]
    pub fn accepts(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (TriggerDirection::Approaching | TriggerDirection::Both, Direction::Approaching)
                | (TriggerDirection::Receding | TriggerDirection::Both, Direction::Receding)
        )
    }
}

#[derive(Debug, Clone)]
pub struct DirectionTracker {
    confirmed: Direction,
    candidate: Direction,
    stability_count: u32,
    required: u32,
}

impl DirectionTracker {
    pub fn new(poll_interval_ms: u32) -> Self {
        Self {
            confirmed: Direction::Stationary,
            candidate: Direction::Stationary,
            stability_count: 0,
            required: stability_samples(DIRECTION_STABILITY_MS, poll_interval_ms),
        }
    }

    /// Feed one candidate. Returns the confirmed direction when this
    /// observation confirms it, `None` while the candidate is still settling.
    pub fn observe(&mut self, candidate: Direction) -> Option<Direction> {
        if candidate == self.candidate {
            self.stability_count = self.stability_count.saturating_add(1);
        } else {
            self.candidate = candidate;
            self.stability_count = 1;
        }
        if self.stability_count >= self.required {
            self.confirmed = candidate;
            Some(candidate)
        } else {
            None
        }
    }

    #[inline]
    pub fn confirmed(&self) -> Direction {
        self.confirmed
    }

    #[inline]
    pub fn candidate(&self) -> Direction {
        self.candidate
    }

    #[inline]
    pub fn stability_count(&self) -> u32 {
        self.stability_count
    }

    #[inline]
    pub fn required_samples(&self) -> u32 {
        self.required
    }

    pub fn reset(&mut self) {
        self.confirmed = Direction::Stationary;
        self.candidate = Direction::Stationary;
        self.stability_count = 0;
    }
}
