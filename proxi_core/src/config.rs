//! Configuration types for the sensing engine.
//!
//! These are the runtime structs the detectors and the fusion manager work
//! with. They are separate from the TOML-deserialized config in
//! `proxi_config`; see `conversions` for the mapping.

use crate::direction::TriggerDirection;
use crate::error::EngineError;

/// Smallest accepted rolling-window capacity.
pub const MIN_WINDOW_SIZE: u8 = 3;
/// Largest accepted rolling-window capacity.
pub const MAX_WINDOW_SIZE: u8 = 20;
/// Slowest accepted poll interval.
pub const MAX_POLL_INTERVAL_MS: u32 = 10_000;

/// Average change between cycles that counts as movement when the window is consistent.
pub const MOVEMENT_THRESHOLD_MM: u32 = 200;
/// Window spread below which readings are considered consistent.
pub const SPREAD_CONSISTENCY_MM: u32 = 100;
/// Average change that counts as movement regardless of spread.
pub const LARGE_JUMP_MM: u32 = 300;
/// Consecutive in-range cycles (without prior approach) that mark a sudden appearance.
pub const SUDDEN_APPEARANCE_SAMPLES: u8 = 3;

/// Per-sensor detection configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    /// Readings below this are treated as absent.
    pub min_range_mm: u32,
    /// Readings above this are treated as absent; also the absent sentinel.
    pub max_range_mm: u32,
    /// Filtered distance at or below which an object is "in range".
    pub detection_threshold_mm: u32,
    /// Average change below which a cycle counts as stationary.
    pub direction_sensitivity_mm: u32,
    /// Rolling-window capacity (3..=20).
    pub sample_window_size: u8,
    /// Desired poll period; raised to the source's floor when slower.
    pub poll_interval_ms: u32,
    /// When false the slot reports plain presence (`filtered <= threshold`).
    pub direction_detection_enabled: bool,
    /// Re-seed the window with the new sample once the spread reaches this.
    /// `None` disables rebasing.
    pub rebase_spread_mm: Option<u32>,
    /// Confirmed directions that may trigger; ignored for presence slots.
    pub trigger_direction: TriggerDirection,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            min_range_mm: 20,
            max_range_mm: 4000,
            detection_threshold_mm: 1100,
            direction_sensitivity_mm: 20,
            sample_window_size: 5,
            poll_interval_ms: 75,
            direction_detection_enabled: true,
            rebase_spread_mm: None,
            trigger_direction: TriggerDirection::Approaching,
        }
    }
}

impl SensorConfig {
    /// Defaults for a presence-only source that reports a nominal distance
    /// while active.
    pub fn presence() -> Self {
        Self {
            min_range_mm: 0,
            max_range_mm: 7000,
            detection_threshold_mm: 5000,
            direction_sensitivity_mm: 20,
            sample_window_size: MIN_WINDOW_SIZE,
            poll_interval_ms: 100,
            direction_detection_enabled: false,
            rebase_spread_mm: None,
            trigger_direction: TriggerDirection::Approaching,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        validate_window_size(self.sample_window_size)?;
        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(EngineError::InvalidPollInterval(self.poll_interval_ms));
        }
        if self.min_range_mm >= self.max_range_mm {
            return Err(EngineError::InvalidRange {
                min_mm: self.min_range_mm,
                max_mm: self.max_range_mm,
            });
        }
        if self.detection_threshold_mm == 0 || self.detection_threshold_mm > self.max_range_mm {
            return Err(EngineError::InvalidThreshold(self.detection_threshold_mm));
        }
        Ok(())
    }

    #[inline]
    pub fn in_range(&self, filtered_mm: u32) -> bool {
        filtered_mm <= self.detection_threshold_mm
    }

    /// Keep readings the sensor can actually report; anything else is absent.
    #[inline]
    pub fn accept(&self, raw_mm: u32) -> Option<u32> {
        (self.min_range_mm..=self.max_range_mm)
            .contains(&raw_mm)
            .then_some(raw_mm)
    }
}

#[inline]
pub fn validate_window_size(size: u8) -> Result<(), EngineError> {
    if (MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(EngineError::InvalidWindowSize(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_validate() {
        SensorConfig::default().validate().unwrap();
        SensorConfig::presence().validate().unwrap();
    }

    #[rstest]
    #[case(2, false)]
    #[case(3, true)]
    #[case(20, true)]
    #[case(21, false)]
    fn window_bounds(#[case] size: u8, #[case] ok: bool) {
        let cfg = SensorConfig {
            sample_window_size: size,
            ..SensorConfig::default()
        };
        assert_eq!(cfg.validate().is_ok(), ok);
        if !ok {
            assert_eq!(cfg.validate(), Err(EngineError::InvalidWindowSize(size)));
        }
    }

    #[rstest]
    #[case(0)]
    #[case(MAX_POLL_INTERVAL_MS + 1)]
    fn poll_interval_rejected(#[case] ms: u32) {
        let cfg = SensorConfig {
            poll_interval_ms: ms,
            ..SensorConfig::default()
        };
        assert_eq!(cfg.validate(), Err(EngineError::InvalidPollInterval(ms)));
    }

    #[test]
    fn inverted_range_rejected() {
        let cfg = SensorConfig {
            min_range_mm: 4000,
            max_range_mm: 20,
            ..SensorConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(EngineError::InvalidRange { .. })
        ));
    }

    #[test]
    fn threshold_beyond_max_rejected() {
        let cfg = SensorConfig {
            detection_threshold_mm: 4500,
            ..SensorConfig::default()
        };
        assert_eq!(cfg.validate(), Err(EngineError::InvalidThreshold(4500)));
    }

    #[test]
    fn accept_filters_out_of_range() {
        let cfg = SensorConfig::default();
        assert_eq!(cfg.accept(10), None);
        assert_eq!(cfg.accept(20), Some(20));
        assert_eq!(cfg.accept(4000), Some(4000));
        assert_eq!(cfg.accept(4001), None);
    }
}
