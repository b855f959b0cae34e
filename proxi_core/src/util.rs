//! Timing helpers shared by the detector, the fusion manager and the sampler.

/// How long a direction candidate must persist before it is reported.
pub const DIRECTION_STABILITY_MS: u32 = 400;

/// Number of consecutive matching samples that span `window_ms` at the
/// given poll interval, rounded up. Always at least 1.
#[inline]
pub fn stability_samples(window_ms: u32, poll_interval_ms: u32) -> u32 {
    window_ms.div_ceil(poll_interval_ms.max(1)).max(1)
}

/// Poll interval actually used for a slot: never faster than the source allows.
#[inline]
pub fn effective_poll_ms(configured_ms: u32, source_min_ms: u32) -> u32 {
    configured_ms.max(source_min_ms).max(1)
}

/// Age after which a published background sample is considered stale.
///
/// Four intervals tolerate a few missed polls before the reading decays
/// to absent.
#[inline]
pub fn stale_limit_ms(interval_ms: u32) -> u64 {
    u64::from(interval_ms.max(1)).saturating_mul(4)
}
