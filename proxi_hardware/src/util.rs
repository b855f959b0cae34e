use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Speed of sound at room temperature, in millimeters per millisecond.
pub const SOUND_MM_PER_MS: u32 = 343;

/// Wait while `cond` holds, or until `timeout` expires.
///
/// Returns the time spent waiting. A zero `poll_interval` spins, which is
/// what echo timing needs; anything larger sleeps between checks.
pub fn wait_while(
    mut cond: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Duration> {
    let start = Instant::now();
    let deadline = start + timeout;
    while cond() {
        if Instant::now() >= deadline {
            return Err(HwError::EchoTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
    Ok(start.elapsed())
}

/// One-way distance for a round-trip echo pulse.
#[inline]
pub fn echo_to_mm(pulse: Duration) -> u32 {
    let us = u64::try_from(pulse.as_micros()).unwrap_or(u64::MAX);
    let mm = us.saturating_mul(u64::from(SOUND_MM_PER_MS)) / 2000;
    u32::try_from(mm).unwrap_or(u32::MAX)
}

/// Longest echo pulse a target at `max_range_mm` can produce.
#[inline]
pub fn echo_timeout_for(max_range_mm: u32) -> Duration {
    let us = u64::from(max_range_mm) * 2000 / u64::from(SOUND_MM_PER_MS);
    Duration::from_micros(us)
}
