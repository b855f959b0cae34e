//! Seams between the sensing engine and the things that feed it.
//!
//! A [`RangeSource`] is one sensing technology (acoustic ranger, presence
//! detector, recorded trace). The engine only ever sees [`Reading`]s and
//! [`Capabilities`]; it never branches on the technology behind them.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type returned by sources; drivers box their own error types.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// One poll result from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// Distance to the nearest reflecting object, in millimeters.
    Distance(u32),
    /// No echo, out of range, or presence line inactive.
    Absent,
}

impl Reading {
    #[inline]
    pub fn distance_mm(self) -> Option<u32> {
        match self {
            Reading::Distance(mm) => Some(mm),
            Reading::Absent => None,
        }
    }

    #[inline]
    pub fn is_absent(self) -> bool {
        matches!(self, Reading::Absent)
    }
}

impl From<Option<u32>> for Reading {
    fn from(v: Option<u32>) -> Self {
        v.map_or(Reading::Absent, Reading::Distance)
    }
}

/// A reading stamped with the engine time (ms) at which it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub value: Reading,
    pub observed_at_ms: u64,
}

impl RawSample {
    #[inline]
    pub fn new(value: Reading, observed_at_ms: u64) -> Self {
        Self {
            value,
            observed_at_ms,
        }
    }

    #[inline]
    pub fn absent(observed_at_ms: u64) -> Self {
        Self::new(Reading::Absent, observed_at_ms)
    }
}

/// Sensing technology behind a source. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Ultrasonic,
    UltrasonicGrove,
    PassiveInfrared,
    Replay,
}

impl SensorKind {
    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Ultrasonic => "ultrasonic",
            SensorKind::UltrasonicGrove => "ultrasonic_grove",
            SensorKind::PassiveInfrared => "pir",
            SensorKind::Replay => "replay",
        }
    }
}

/// Static description of what a source can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub kind: SensorKind,
    /// False for presence-only sources that report a nominal distance.
    pub measures_distance: bool,
    pub min_range_mm: u32,
    pub max_range_mm: u32,
    /// Floor on the poll period imposed by the transport (echo settle time etc.).
    pub min_poll_interval_ms: u32,
    /// Time after power-up before readings are meaningful.
    pub warmup_ms: u32,
}

/// A sensing technology that yields one [`Reading`] per poll.
///
/// `poll` is a bounded blocking call: it returns within
/// [`RangeSource::max_latency_ms`] even when nothing answers, in which case
/// it yields `Reading::Absent`. An `Err` means the transport itself failed
/// (GPIO fault, closed channel); the engine treats it like `Absent`.
pub trait RangeSource {
    fn poll(&mut self) -> Result<Reading, SourceError>;

    /// False while the source is warming up or otherwise unusable.
    fn is_ready(&self) -> bool {
        true
    }

    fn capabilities(&self) -> Capabilities;

    /// Upper bound on how long a single `poll` may block.
    fn max_latency_ms(&self) -> u32 {
        self.capabilities().min_poll_interval_ms
    }
}

impl<T: RangeSource + ?Sized> RangeSource for Box<T> {
    fn poll(&mut self) -> Result<Reading, SourceError> {
        (**self).poll()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn max_latency_ms(&self) -> u32 {
        (**self).max_latency_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Reading);

    impl RangeSource for Fixed {
        fn poll(&mut self) -> Result<Reading, SourceError> {
            Ok(self.0)
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                kind: SensorKind::Replay,
                measures_distance: true,
                min_range_mm: 0,
                max_range_mm: 4000,
                min_poll_interval_ms: 10,
                warmup_ms: 0,
            }
        }
    }

    #[test]
    fn boxed_source_delegates() {
        let mut src: Box<dyn RangeSource> = Box::new(Fixed(Reading::Distance(1200)));
        assert!(src.is_ready());
        assert_eq!(src.poll().unwrap(), Reading::Distance(1200));
        assert_eq!(src.max_latency_ms(), 10);
    }

    #[test]
    fn reading_from_option() {
        assert_eq!(Reading::from(Some(5)), Reading::Distance(5));
        assert!(Reading::from(None).is_absent());
        assert_eq!(Reading::Distance(7).distance_mm(), Some(7));
    }
}
