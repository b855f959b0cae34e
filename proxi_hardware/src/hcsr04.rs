use std::time::Duration;

use proxi_traits::{Capabilities, RangeSource, Reading, SourceError};
use rppal::gpio::{Gpio, InputPin, IoPin, Mode, OutputPin};
use tracing::{trace, warn};

use crate::error::{HwError, Result};
use crate::util::{echo_to_mm, wait_while};

/// How long the echo line may take to rise after the trigger pulse.
const ECHO_START_TIMEOUT: Duration = Duration::from_millis(5);
/// The module drops echo after ~38 ms with nothing in range; longer means stuck.
const ECHO_STUCK_TIMEOUT: Duration = Duration::from_millis(40);
const TRIGGER_PULSE: Duration = Duration::from_micros(10);

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

fn settle(d: Duration) {
    // sub-10us waits are below the scheduler's resolution
    let _ = wait_while(|| true, d, Duration::ZERO);
}

fn classify(mm: u32, caps: &Capabilities) -> Reading {
    if (caps.min_range_mm..=caps.max_range_mm).contains(&mm) {
        Reading::Distance(mm)
    } else {
        Reading::Absent
    }
}

/// Four-pin acoustic ranger: separate trigger and echo lines.
pub struct Hcsr04 {
    trigger: OutputPin,
    echo: InputPin,
    capabilities: Capabilities,
}

impl Hcsr04 {
    pub fn new(trigger_pin: u8, echo_pin: u8, capabilities: Capabilities) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut trigger = gpio.get(trigger_pin).map_err(gpio_err)?.into_output();
        trigger.set_low();
        let echo = gpio.get(echo_pin).map_err(gpio_err)?.into_input();
        Ok(Self {
            trigger,
            echo,
            capabilities,
        })
    }

    /// One ping. No echo at all reads as absent; an echo that never ends is an error.
    pub fn measure(&mut self) -> Result<Reading> {
        self.trigger.set_low();
        settle(Duration::from_micros(2));
        self.trigger.set_high();
        settle(TRIGGER_PULSE);
        self.trigger.set_low();

        let echo = &self.echo;
        if wait_while(|| echo.is_low(), ECHO_START_TIMEOUT, Duration::ZERO).is_err() {
            trace!("no echo");
            return Ok(Reading::Absent);
        }
        let pulse = wait_while(|| echo.is_high(), ECHO_STUCK_TIMEOUT, Duration::ZERO)?;
        let mm = echo_to_mm(pulse);
        trace!(pulse_us = pulse.as_micros(), mm, "hc-sr04 echo");
        Ok(classify(mm, &self.capabilities))
    }
}

impl RangeSource for Hcsr04 {
    fn poll(&mut self) -> std::result::Result<Reading, SourceError> {
        self.measure().map_err(|e| {
            warn!(error = %e, "hc-sr04 read failed");
            SourceError::from(e)
        })
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// Three-pin ranger: trigger and echo share one signal line.
pub struct GroveUltrasonic {
    signal: IoPin,
    capabilities: Capabilities,
}

impl GroveUltrasonic {
    pub fn new(signal_pin: u8, capabilities: Capabilities) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let signal = gpio.get(signal_pin).map_err(gpio_err)?.into_io(Mode::Output);
        Ok(Self {
            signal,
            capabilities,
        })
    }

    pub fn measure(&mut self) -> Result<Reading> {
        self.signal.set_mode(Mode::Output);
        self.signal.set_low();
        settle(Duration::from_micros(2));
        self.signal.set_high();
        settle(TRIGGER_PULSE);
        self.signal.set_low();
        self.signal.set_mode(Mode::Input);

        let signal = &self.signal;
        if wait_while(|| signal.is_low(), ECHO_START_TIMEOUT, Duration::ZERO).is_err() {
            return Ok(Reading::Absent);
        }
        let pulse = wait_while(|| signal.is_high(), ECHO_STUCK_TIMEOUT, Duration::ZERO)?;
        let mm = echo_to_mm(pulse);
        trace!(pulse_us = pulse.as_micros(), mm, "grove echo");
        Ok(classify(mm, &self.capabilities))
    }
}

impl RangeSource for GroveUltrasonic {
    fn poll(&mut self) -> std::result::Result<Reading, SourceError> {
        self.measure().map_err(|e| {
            warn!(error = %e, "grove ranger read failed");
            SourceError::from(e)
        })
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
