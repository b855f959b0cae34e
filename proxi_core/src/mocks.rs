//! Scripted sources for tests, benches and dry runs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use proxi_traits::{Capabilities, RangeSource, Reading, SensorKind, SourceError};

/// Capabilities of a scripted source: full range, no pacing floor.
pub const SCRIPTED_CAPABILITIES: Capabilities = Capabilities {
    kind: SensorKind::Replay,
    measures_distance: true,
    min_range_mm: 0,
    max_range_mm: u32::MAX,
    min_poll_interval_ms: 0,
    warmup_ms: 0,
};

/// Yields a fixed sequence of readings, then `Absent` forever.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    readings: VecDeque<Reading>,
    capabilities: Capabilities,
    ready: Arc<AtomicBool>,
    polls: usize,
}

impl ScriptedSource {
    pub fn new(readings: impl IntoIterator<Item = Reading>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            capabilities: SCRIPTED_CAPABILITIES,
            ready: Arc::new(AtomicBool::new(true)),
            polls: 0,
        }
    }

    /// Distances in mm; `0` stands for an absent reading.
    pub fn from_mm(values: &[u32]) -> Self {
        Self::new(values.iter().map(|&v| {
            if v == 0 {
                Reading::Absent
            } else {
                Reading::Distance(v)
            }
        }))
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Shared readiness flag; flip it to simulate warm-up.
    pub fn ready_flag(&self) -> Arc<AtomicBool> {
        self.ready.clone()
    }

    pub fn push(&mut self, reading: Reading) {
        self.readings.push_back(reading);
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl RangeSource for ScriptedSource {
    fn poll(&mut self) -> Result<Reading, SourceError> {
        self.polls += 1;
        Ok(self.readings.pop_front().unwrap_or(Reading::Absent))
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// Always fails its poll with the given message.
#[derive(Debug, Clone)]
pub struct FailingSource {
    message: String,
}

impl FailingSource {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl RangeSource for FailingSource {
    fn poll(&mut self) -> Result<Reading, SourceError> {
        Err(Box::new(std::io::Error::other(self.message.clone())))
    }

    fn capabilities(&self) -> Capabilities {
        SCRIPTED_CAPABILITIES
    }
}
