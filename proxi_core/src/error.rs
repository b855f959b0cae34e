use thiserror::Error;

/// Rejected engine mutation. The engine's prior state is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("sensor slot {0} is already occupied")]
    SlotOccupied(usize),
    #[error("sensor slot {0} is empty")]
    SlotEmpty(usize),
    #[error("sensor slot {0} is out of range (0..{max})", max = crate::fusion::MAX_SLOTS)]
    SlotOutOfRange(usize),
    #[error(
        "sample window size {0} is invalid (expected {min}..={max})",
        min = crate::config::MIN_WINDOW_SIZE,
        max = crate::config::MAX_WINDOW_SIZE
    )]
    InvalidWindowSize(u8),
    #[error(
        "poll interval {0} ms is invalid (expected 1..={max})",
        max = crate::config::MAX_POLL_INTERVAL_MS
    )]
    InvalidPollInterval(u32),
    #[error("range {min_mm}..{max_mm} mm is invalid (min must be below max)")]
    InvalidRange { min_mm: u32, max_mm: u32 },
    #[error("detection threshold {0} mm lies outside the sensor range")]
    InvalidThreshold(u32),
    #[error("invalid sensor topology: {0}")]
    InvalidTopology(&'static str),
    #[error("invalid approach sequence: {0}")]
    InvalidSequence(&'static str),
}

/// Why a source poll failed; used for logging only, the reading itself
/// is always absorbed as absent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceFault {
    #[error("source timed out")]
    Timeout,
    #[error("source hardware fault: {0}")]
    Hardware(String),
    #[error("source disconnected")]
    Disconnected,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
