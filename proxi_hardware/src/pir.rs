use std::time::Instant;

use proxi_traits::{Capabilities, RangeSource, Reading, SourceError};
use rppal::gpio::{Gpio, InputPin};

use crate::error::{HwError, Result};

/// Passive-infrared module on a single digital output.
///
/// A high line reads as `presence_mm`; the sensor never measures distance.
pub struct GpioPir {
    signal: InputPin,
    presence_mm: u32,
    capabilities: Capabilities,
    powered_at: Instant,
}

impl GpioPir {
    pub fn new(signal_pin: u8, presence_mm: u32, capabilities: Capabilities) -> Result<Self> {
        let signal = Gpio::new()
            .and_then(|g| g.get(signal_pin))
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_input_pulldown();
        Ok(Self {
            signal,
            presence_mm,
            capabilities,
            powered_at: Instant::now(),
        })
    }
}

impl RangeSource for GpioPir {
    fn poll(&mut self) -> std::result::Result<Reading, SourceError> {
        Ok(if self.signal.is_high() {
            Reading::Distance(self.presence_mm)
        } else {
            Reading::Absent
        })
    }

    fn is_ready(&self) -> bool {
        self.powered_at.elapsed().as_millis() >= u128::from(self.capabilities.warmup_ms)
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
