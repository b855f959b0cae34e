//! Two-zone approach sequence.
//!
//! Watches the motion flags of a "far" and a "near" slot. Far rising and
//! then near rising within the confirmation window means someone is walking
//! toward the device. Near first (hand wave, object placed close) or both
//! rising together is counted as unknown.

use tracing::debug;

use crate::error::EngineError;
use crate::fusion::MAX_SLOTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceConfig {
    pub far_slot: usize,
    pub near_slot: usize,
    /// Max time from far rising to near rising.
    pub confirmation_window_ms: u32,
    /// Rises closer together than this are ambiguous.
    pub simultaneous_threshold_ms: u32,
    /// Any non-idle pattern older than this is abandoned.
    pub pattern_timeout_ms: u32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            far_slot: 0,
            near_slot: 1,
            confirmation_window_ms: 5000,
            simultaneous_threshold_ms: 500,
            pattern_timeout_ms: 10_000,
        }
    }
}

impl SequenceConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.far_slot >= MAX_SLOTS {
            return Err(EngineError::SlotOutOfRange(self.far_slot));
        }
        if self.near_slot >= MAX_SLOTS {
            return Err(EngineError::SlotOutOfRange(self.near_slot));
        }
        if self.far_slot == self.near_slot {
            return Err(EngineError::InvalidSequence("far and near slots must differ"));
        }
        if !(1000..=30_000).contains(&self.confirmation_window_ms) {
            return Err(EngineError::InvalidSequence(
                "confirmation window must be 1000..=30000 ms",
            ));
        }
        if self.simultaneous_threshold_ms > 2000 {
            return Err(EngineError::InvalidSequence(
                "simultaneous threshold must be <= 2000 ms",
            ));
        }
        if self.pattern_timeout_ms < self.confirmation_window_ms {
            return Err(EngineError::InvalidSequence(
                "pattern timeout must not be shorter than the confirmation window",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SequenceState {
    #[default]
    Idle,
    FarOnly,
    NearOnly,
    BothActive,
    Approaching,
}

impl SequenceState {
    pub fn name(self) -> &'static str {
        match self {
            SequenceState::Idle => "idle",
            SequenceState::FarOnly => "far_only",
            SequenceState::NearOnly => "near_only",
            SequenceState::BothActive => "both_active",
            SequenceState::Approaching => "approaching",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApproachSequence {
    cfg: SequenceConfig,
    state: SequenceState,
    state_since_ms: u64,
    // Kept across resets so back-to-back rises can still be judged simultaneous.
    last_far_rise_ms: Option<u64>,
    last_near_rise_ms: Option<u64>,
    confirmed_at_ms: Option<u64>,
    prev_far: bool,
    prev_near: bool,
    approaching_count: u32,
    unknown_count: u32,
}

impl ApproachSequence {
    pub fn new(cfg: SequenceConfig) -> Result<Self, EngineError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            state: SequenceState::Idle,
            state_since_ms: 0,
            last_far_rise_ms: None,
            last_near_rise_ms: None,
            confirmed_at_ms: None,
            prev_far: false,
            prev_near: false,
            approaching_count: 0,
            unknown_count: 0,
        })
    }

    pub fn update(&mut self, far: bool, near: bool, now_ms: u64) -> SequenceState {
        if far && !self.prev_far {
            self.on_far_rise(near, now_ms);
        }
        if near && !self.prev_near {
            self.on_near_rise(far, now_ms);
        }
        let settled = matches!(self.state, SequenceState::Idle | SequenceState::Approaching);
        if !far && self.prev_far && !near && !settled {
            self.reset_state();
        }
        if !near && self.prev_near && !far && self.state != SequenceState::Idle {
            self.reset_state();
        }

        self.step(far, near);

        if self.state != SequenceState::Idle
            && now_ms.saturating_sub(self.state_since_ms) > u64::from(self.cfg.pattern_timeout_ms)
        {
            debug!(state = self.state.name(), "approach pattern timed out");
            self.unknown_count = self.unknown_count.saturating_add(1);
            self.reset_state();
        }

        self.prev_far = far;
        self.prev_near = near;
        self.state
    }

    fn simultaneous(&self, other_rise: Option<u64>, now_ms: u64) -> bool {
        other_rise.is_some_and(|t| now_ms.abs_diff(t) < u64::from(self.cfg.simultaneous_threshold_ms))
    }

    fn on_far_rise(&mut self, near_active: bool, now_ms: u64) {
        self.last_far_rise_ms = Some(now_ms);
        if near_active && self.simultaneous(self.last_near_rise_ms, now_ms) {
            self.unknown_count = self.unknown_count.saturating_add(1);
            return;
        }
        if self.state == SequenceState::Idle {
            self.enter(SequenceState::FarOnly, now_ms);
        }
    }

    fn on_near_rise(&mut self, far_active: bool, now_ms: u64) {
        self.last_near_rise_ms = Some(now_ms);
        if far_active && self.simultaneous(self.last_far_rise_ms, now_ms) {
            self.unknown_count = self.unknown_count.saturating_add(1);
            return;
        }
        match self.state {
            SequenceState::Idle => {
                self.enter(SequenceState::NearOnly, now_ms);
                self.unknown_count = self.unknown_count.saturating_add(1);
            }
            SequenceState::FarOnly => {
                let within = self.last_far_rise_ms.is_some_and(|t| {
                    now_ms.saturating_sub(t) <= u64::from(self.cfg.confirmation_window_ms)
                });
                if within {
                    self.enter(SequenceState::Approaching, now_ms);
                    self.confirmed_at_ms = Some(now_ms);
                    self.approaching_count = self.approaching_count.saturating_add(1);
                    debug!(count = self.approaching_count, "approach confirmed");
                } else {
                    self.unknown_count = self.unknown_count.saturating_add(1);
                }
            }
            _ => {}
        }
    }

    fn step(&mut self, far: bool, near: bool) {
        match self.state {
            SequenceState::Idle => {}
            SequenceState::FarOnly => {
                if far && near {
                    self.state = SequenceState::BothActive;
                } else if !far {
                    self.reset_state();
                }
            }
            SequenceState::NearOnly => {
                if far && near {
                    self.state = SequenceState::BothActive;
                } else if !near {
                    self.reset_state();
                }
            }
            SequenceState::BothActive | SequenceState::Approaching => {
                if !far && !near {
                    self.reset_state();
                }
            }
        }
    }

    fn enter(&mut self, state: SequenceState, now_ms: u64) {
        self.state = state;
        self.state_since_ms = now_ms;
    }

    fn reset_state(&mut self) {
        self.state = SequenceState::Idle;
        self.state_since_ms = 0;
        self.confirmed_at_ms = None;
    }

    #[inline]
    pub fn state(&self) -> SequenceState {
        self.state
    }

    #[inline]
    pub fn is_approaching(&self) -> bool {
        self.state == SequenceState::Approaching
    }

    /// How long the current approach has been confirmed.
    pub fn confidence_ms(&self, now_ms: u64) -> u64 {
        self.confirmed_at_ms
            .map_or(0, |t| now_ms.saturating_sub(t))
    }

    #[inline]
    pub fn config(&self) -> &SequenceConfig {
        &self.cfg
    }

    #[inline]
    pub fn approaching_count(&self) -> u32 {
        self.approaching_count
    }

    #[inline]
    pub fn unknown_count(&self) -> u32 {
        self.unknown_count
    }

    pub fn reset_statistics(&mut self) {
        self.approaching_count = 0;
        self.unknown_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn seq() -> ApproachSequence {
        ApproachSequence::new(SequenceConfig::default()).unwrap()
    }

    #[test]
    fn far_then_near_confirms() {
        let mut s = seq();
        assert_eq!(s.update(true, false, 1_000), SequenceState::FarOnly);
        assert_eq!(s.update(true, true, 2_000), SequenceState::Approaching);
        assert!(s.is_approaching());
        assert_eq!(s.approaching_count(), 1);
        assert_eq!(s.confidence_ms(2_500), 500);
        assert_eq!(s.update(false, false, 3_000), SequenceState::Idle);
    }

    #[test]
    fn near_first_is_unknown() {
        let mut s = seq();
        assert_eq!(s.update(false, true, 1_000), SequenceState::NearOnly);
        assert_eq!(s.update(true, true, 2_000), SequenceState::BothActive);
        assert_eq!(s.approaching_count(), 0);
        assert_eq!(s.unknown_count(), 1);
    }

    #[test]
    fn simultaneous_rise_is_unknown() {
        let mut s = seq();
        let state = s.update(true, true, 1_000);
        assert_ne!(state, SequenceState::Approaching);
        assert_eq!(s.unknown_count(), 1);
    }

    #[test]
    fn late_near_is_not_an_approach() {
        let mut s = seq();
        s.update(true, false, 1_000);
        assert_eq!(s.update(true, true, 6_500), SequenceState::BothActive);
        assert_eq!(s.approaching_count(), 0);
        assert_eq!(s.unknown_count(), 1);
    }

    #[test]
    fn stale_pattern_times_out() {
        let mut s = seq();
        s.update(true, false, 1_000);
        assert_eq!(s.update(true, false, 11_500), SequenceState::Idle);
        assert_eq!(s.unknown_count(), 1);
    }

    #[test]
    fn far_clearing_alone_resets() {
        let mut s = seq();
        s.update(true, false, 1_000);
        assert_eq!(s.update(false, false, 1_200), SequenceState::Idle);
    }

    #[rstest]
    #[case(SequenceConfig { far_slot: 1, near_slot: 1, ..SequenceConfig::default() })]
    #[case(SequenceConfig { near_slot: 4, ..SequenceConfig::default() })]
    #[case(SequenceConfig { confirmation_window_ms: 500, ..SequenceConfig::default() })]
    #[case(SequenceConfig { simultaneous_threshold_ms: 2500, ..SequenceConfig::default() })]
    #[case(SequenceConfig { pattern_timeout_ms: 1000, ..SequenceConfig::default() })]
    fn invalid_configs_rejected(#[case] cfg: SequenceConfig) {
        assert!(ApproachSequence::new(cfg).is_err());
    }
}
