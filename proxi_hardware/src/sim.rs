//! Sources that need no wiring: a simulated walker, a simulated presence
//! sensor, and a recorded trace.
//!
//! All of them read time from a `Clock`, so a `ManualClock` drives them
//! deterministically.

use std::time::Instant;

use proxi_traits::clock::Clock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use proxi_traits::{Capabilities, RangeSource, Reading, SourceError};
use tracing::trace;

/// Repeating walk: approach from `start_mm` to `end_mm`, stand still for
/// `hold_ms`, then leave the field of view for `hold_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkProfile {
    pub start_mm: u32,
    pub end_mm: u32,
    pub speed_mm_s: u32,
    pub hold_ms: u32,
    /// Uniform noise amplitude added to every reading.
    pub noise_mm: u32,
    pub seed: u64,
}

impl Default for WalkProfile {
    fn default() -> Self {
        Self {
            start_mm: 3500,
            end_mm: 400,
            speed_mm_s: 1300,
            hold_ms: 1000,
            noise_mm: 10,
            seed: 0x5eed,
        }
    }
}

impl WalkProfile {
    pub fn approach_ms(&self) -> u64 {
        u64::from(self.start_mm.abs_diff(self.end_mm)) * 1000 / u64::from(self.speed_mm_s.max(1))
    }

    pub fn period_ms(&self) -> u64 {
        (self.approach_ms() + 2 * u64::from(self.hold_ms)).max(1)
    }

    /// Noise-free distance `t_ms` into the walk; `None` while nobody is there.
    pub fn distance_at(&self, t_ms: u64) -> Option<u32> {
        let t = t_ms % self.period_ms();
        let approach = self.approach_ms();
        if t < approach {
            let start = i64::from(self.start_mm);
            let span = i64::from(self.end_mm) - start;
            // t < approach, so the quotient stays within the span
            let offset = span * i64::try_from(t).unwrap_or(0) / i64::try_from(approach).unwrap_or(1);
            u32::try_from(start + offset).ok()
        } else if t < approach + u64::from(self.hold_ms) {
            Some(self.end_mm)
        } else {
            None
        }
    }
}

/// Uniform jitter in `-amp..=amp`.
fn jitter(rng: &mut StdRng, amp: u32) -> i64 {
    if amp == 0 {
        return 0;
    }
    let amp = i64::from(amp);
    rng.gen_range(-amp..=amp)
}

fn warmed_up<C: Clock>(clock: &C, epoch: Instant, caps: &Capabilities) -> bool {
    clock.ms_since(epoch) >= u64::from(caps.warmup_ms)
}

/// Ultrasonic ranger following a [`WalkProfile`].
#[derive(Debug)]
pub struct SimulatedUltrasonic<C: Clock> {
    profile: WalkProfile,
    capabilities: Capabilities,
    clock: C,
    epoch: Instant,
    rng: StdRng,
}

impl<C: Clock> SimulatedUltrasonic<C> {
    pub fn new(profile: WalkProfile, capabilities: Capabilities, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            rng: StdRng::seed_from_u64(profile.seed),
            profile,
            capabilities,
            clock,
            epoch,
        }
    }

    pub fn profile(&self) -> &WalkProfile {
        &self.profile
    }
}

impl<C: Clock> RangeSource for SimulatedUltrasonic<C> {
    fn poll(&mut self) -> Result<Reading, SourceError> {
        let t = self.clock.ms_since(self.epoch);
        let Some(mm) = self.profile.distance_at(t) else {
            return Ok(Reading::Absent);
        };
        let noisy = i64::from(mm) + jitter(&mut self.rng, self.profile.noise_mm);
        let caps = &self.capabilities;
        let reading = match u32::try_from(noisy) {
            Ok(v) if (caps.min_range_mm..=caps.max_range_mm).contains(&v) => Reading::Distance(v),
            _ => Reading::Absent,
        };
        trace!(t_ms = t, ?reading, "simulated ultrasonic");
        Ok(reading)
    }

    fn is_ready(&self) -> bool {
        warmed_up(&self.clock, self.epoch, &self.capabilities)
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// Alternating idle/active presence, after the warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresencePattern {
    pub idle_ms: u32,
    pub active_ms: u32,
    /// Nominal distance reported while active.
    pub presence_mm: u32,
}

impl Default for PresencePattern {
    fn default() -> Self {
        Self {
            idle_ms: 5000,
            active_ms: 3000,
            presence_mm: 1000,
        }
    }
}

/// Passive-infrared presence sensor. Reports `presence_mm` while active.
#[derive(Debug)]
pub struct SimulatedPir<C: Clock> {
    pattern: PresencePattern,
    capabilities: Capabilities,
    clock: C,
    epoch: Instant,
}

impl<C: Clock> SimulatedPir<C> {
    pub fn new(pattern: PresencePattern, capabilities: Capabilities, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            pattern,
            capabilities,
            clock,
            epoch,
        }
    }
}

impl<C: Clock> RangeSource for SimulatedPir<C> {
    fn poll(&mut self) -> Result<Reading, SourceError> {
        let since_warm = self
            .clock
            .ms_since(self.epoch)
            .saturating_sub(u64::from(self.capabilities.warmup_ms));
        let period = u64::from(self.pattern.idle_ms) + u64::from(self.pattern.active_ms);
        let active = period > 0 && since_warm % period >= u64::from(self.pattern.idle_ms);
        Ok(if active {
            Reading::Distance(self.pattern.presence_mm)
        } else {
            Reading::Absent
        })
    }

    fn is_ready(&self) -> bool {
        warmed_up(&self.clock, self.epoch, &self.capabilities)
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// One recorded reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSample {
    pub t_ms: u64,
    pub reading: Reading,
}

/// Replays a recorded trace against the clock.
///
/// A poll returns the newest sample at or before now. Past the last sample
/// by more than the linger time, the trace reads absent.
#[derive(Debug)]
pub struct TraceSource<C: Clock> {
    samples: Vec<TraceSample>,
    capabilities: Capabilities,
    clock: C,
    epoch: Instant,
    cursor: usize,
    linger_ms: u64,
}

impl<C: Clock> TraceSource<C> {
    /// `samples` must be ordered by time.
    pub fn new(samples: Vec<TraceSample>, capabilities: Capabilities, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            samples,
            capabilities,
            clock,
            epoch,
            cursor: 0,
            linger_ms: 1000,
        }
    }

    #[must_use]
    pub fn with_linger_ms(mut self, ms: u64) -> Self {
        self.linger_ms = ms;
        self
    }

    /// True once the clock has passed the last sample plus the linger time.
    pub fn is_finished(&self) -> bool {
        let now = self.clock.ms_since(self.epoch);
        self.samples
            .last()
            .is_none_or(|last| now > last.t_ms.saturating_add(self.linger_ms))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl<C: Clock> RangeSource for TraceSource<C> {
    fn poll(&mut self) -> Result<Reading, SourceError> {
        let now = self.clock.ms_since(self.epoch);
        while self
            .samples
            .get(self.cursor + 1)
            .is_some_and(|next| next.t_ms <= now)
        {
            self.cursor += 1;
        }
        let Some(current) = self.samples.get(self.cursor) else {
            return Ok(Reading::Absent);
        };
        if current.t_ms > now || self.is_finished() {
            return Ok(Reading::Absent);
        }
        Ok(current.reading)
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
