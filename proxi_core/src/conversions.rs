//! `From` implementations bridging `proxi_config` types to `proxi_core` types.
//!
//! Resolution of omitted keys happens in `proxi_config`; these only copy.

use crate::config::SensorConfig;
use crate::direction::TriggerDirection;
use crate::fusion::FusionPolicy;
use crate::sequence::SequenceConfig;

// ── SensorConfig ─────────────────────────────────────────────────────────────

impl From<&proxi_config::SensorCfg> for SensorConfig {
    fn from(c: &proxi_config::SensorCfg) -> Self {
        Self {
            min_range_mm: c.min_range_mm(),
            max_range_mm: c.max_range_mm(),
            detection_threshold_mm: c.detection_threshold_mm(),
            direction_sensitivity_mm: c.direction_sensitivity_mm(),
            sample_window_size: c.sample_window_size(),
            poll_interval_ms: c.poll_interval_ms(),
            direction_detection_enabled: c.direction_detection(),
            rebase_spread_mm: c.rebase_spread_mm,
            trigger_direction: c.trigger_direction().into(),
        }
    }
}

// ── TriggerDirection ─────────────────────────────────────────────────────────

impl From<proxi_config::TriggerDirectionCfg> for TriggerDirection {
    fn from(t: proxi_config::TriggerDirectionCfg) -> Self {
        match t {
            proxi_config::TriggerDirectionCfg::Approaching => TriggerDirection::Approaching,
            proxi_config::TriggerDirectionCfg::Receding => TriggerDirection::Receding,
            proxi_config::TriggerDirectionCfg::Both => TriggerDirection::Both,
        }
    }
}

// ── FusionPolicy ─────────────────────────────────────────────────────────────

impl From<proxi_config::Policy> for FusionPolicy {
    fn from(p: proxi_config::Policy) -> Self {
        match p {
            proxi_config::Policy::Any => FusionPolicy::Any,
            proxi_config::Policy::All => FusionPolicy::All,
            proxi_config::Policy::TriggerMeasure => FusionPolicy::TriggerMeasure,
            proxi_config::Policy::Independent => FusionPolicy::Independent,
        }
    }
}

// ── SequenceConfig ───────────────────────────────────────────────────────────

impl From<&proxi_config::SequenceCfg> for SequenceConfig {
    fn from(c: &proxi_config::SequenceCfg) -> Self {
        Self {
            far_slot: c.far_slot,
            near_slot: c.near_slot,
            confirmation_window_ms: c.confirmation_window_ms,
            simultaneous_threshold_ms: c.simultaneous_threshold_ms,
            pattern_timeout_ms: c.pattern_timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxi_config::{SensorCfg, SensorKindCfg};

    #[test]
    fn pir_defaults_map_to_presence_config() {
        let cfg = SensorCfg::new(0, SensorKindCfg::Pir);
        let core = SensorConfig::from(&cfg);
        assert_eq!(core, SensorConfig::presence());
        assert!(core.validate().is_ok());
    }

    #[test]
    fn ultrasonic_defaults_map_to_engine_defaults() {
        let cfg = SensorCfg::new(1, SensorKindCfg::Ultrasonic);
        assert_eq!(SensorConfig::from(&cfg), SensorConfig::default());
    }

    #[test]
    fn rebase_limit_is_carried() {
        let mut cfg = SensorCfg::new(1, SensorKindCfg::UltrasonicGrove);
        cfg.rebase_spread_mm = Some(2500);
        let core = SensorConfig::from(&cfg);
        assert_eq!(core.rebase_spread_mm, Some(2500));
        assert_eq!(core.max_range_mm, 3500);
        assert_eq!(core.trigger_direction, TriggerDirection::Approaching);
    }

    #[test]
    fn trigger_direction_is_carried() {
        let mut cfg = SensorCfg::new(0, SensorKindCfg::Ultrasonic);
        cfg.trigger_direction = Some(proxi_config::TriggerDirectionCfg::Both);
        assert_eq!(SensorConfig::from(&cfg).trigger_direction, TriggerDirection::Both);
    }
}
