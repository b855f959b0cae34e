//! Range sources: simulated ones always, GPIO drivers behind `hardware`.
pub mod error;
pub mod sim;
pub mod util;

#[cfg(feature = "hardware")]
pub mod hcsr04;
#[cfg(feature = "hardware")]
pub mod pir;

pub use error::HwError;
#[cfg(feature = "hardware")]
pub use hcsr04::{GroveUltrasonic, Hcsr04};
#[cfg(feature = "hardware")]
pub use pir::GpioPir;
pub use sim::{PresencePattern, SimulatedPir, SimulatedUltrasonic, TraceSample, TraceSource, WalkProfile};

use proxi_traits::{Capabilities, SensorKind};

/// Four-pin HC-SR04 class ranger.
pub const ULTRASONIC: Capabilities = Capabilities {
    kind: SensorKind::Ultrasonic,
    measures_distance: true,
    min_range_mm: 20,
    max_range_mm: 4000,
    min_poll_interval_ms: 60,
    warmup_ms: 0,
};

/// Three-pin ranger; shorter reach than the four-pin module.
pub const ULTRASONIC_GROVE: Capabilities = Capabilities {
    kind: SensorKind::UltrasonicGrove,
    max_range_mm: 3500,
    ..ULTRASONIC
};

pub const PIR: Capabilities = Capabilities {
    kind: SensorKind::PassiveInfrared,
    measures_distance: false,
    min_range_mm: 0,
    max_range_mm: 7000,
    min_poll_interval_ms: 0,
    warmup_ms: 60_000,
};

/// Capabilities for replaying a trace recorded from a source with `template`'s range.
pub const fn replay_of(template: Capabilities) -> Capabilities {
    Capabilities {
        kind: SensorKind::Replay,
        min_poll_interval_ms: 0,
        warmup_ms: 0,
        ..template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grove_shares_ultrasonic_timing() {
        assert_eq!(ULTRASONIC_GROVE.min_poll_interval_ms, ULTRASONIC.min_poll_interval_ms);
        assert!(ULTRASONIC_GROVE.max_range_mm < ULTRASONIC.max_range_mm);
    }

    #[test]
    fn replay_keeps_range_and_drops_pacing() {
        let r = replay_of(PIR);
        assert_eq!(r.kind, SensorKind::Replay);
        assert_eq!(r.max_range_mm, 7000);
        assert_eq!(r.warmup_ms, 0);
        assert!(!r.measures_distance);
    }
}
