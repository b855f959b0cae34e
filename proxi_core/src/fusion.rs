//! Multi-sensor fusion over up to [`MAX_SLOTS`] detectors.
//!
//! The manager exclusively owns every slot's detector and source. One call
//! to [`SensorFusionManager::update`] polls every due slot, then fuses, so a
//! [`CombinedStatus`] never mixes slots from different cycles.

use proxi_traits::{Capabilities, RangeSource, RawSample, Reading};
use tracing::{debug, info, trace, warn};

use crate::config::SensorConfig;
use crate::detector::PerSensorDetector;
use crate::direction::Direction;
use crate::error::EngineError;
use crate::hw_error::classify_source_error;
use crate::status::{CombinedStatus, Edge, EdgeCounter, PerSensorStatus};
use crate::util::effective_poll_ms;

pub const MAX_SLOTS: usize = 4;

/// Source type stored in a slot.
pub type BoxedSource = Box<dyn RangeSource + Send>;

/// How per-slot decisions combine into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FusionPolicy {
    /// Any participating slot detecting.
    #[default]
    Any,
    /// Every participating slot detecting.
    All,
    /// The primary gates; a measurement slot reports distance and direction.
    TriggerMeasure,
    /// Consumers read per-slot statuses; the decision mirrors the primary.
    Independent,
}

impl FusionPolicy {
    pub fn name(self) -> &'static str {
        match self {
            FusionPolicy::Any => "any",
            FusionPolicy::All => "all",
            FusionPolicy::TriggerMeasure => "trigger_measure",
            FusionPolicy::Independent => "independent",
        }
    }
}

pub struct SensorSlot {
    name: String,
    detector: PerSensorDetector,
    source: BoxedSource,
    capabilities: Capabilities,
    enabled: bool,
    is_primary: bool,
    poll_interval_ms: u32,
    last_poll_ms: Option<u64>,
    status: Option<PerSensorStatus>,
}

impl std::fmt::Debug for SensorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSlot")
            .field("name", &self.name)
            .field("kind", &self.capabilities.kind)
            .field("enabled", &self.enabled)
            .field("is_primary", &self.is_primary)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .finish_non_exhaustive()
    }
}

impl SensorSlot {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn config(&self) -> &SensorConfig {
        self.detector.config()
    }

    #[inline]
    pub fn detector(&self) -> &PerSensorDetector {
        &self.detector
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.source.is_ready()
    }

    /// Poll period in use: the configured one raised to the source's floor.
    #[inline]
    pub fn poll_interval_ms(&self) -> u32 {
        self.poll_interval_ms
    }

    #[inline]
    pub fn status(&self) -> Option<&PerSensorStatus> {
        self.status.as_ref()
    }

    fn is_due(&self, now_ms: u64) -> bool {
        self.last_poll_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= u64::from(self.poll_interval_ms))
    }

    fn participating(&self) -> Option<&PerSensorStatus> {
        if self.enabled { self.status.as_ref() } else { None }
    }

    fn restart(&mut self) {
        self.detector.reset();
        self.last_poll_ms = None;
        self.status = None;
    }

    /// The detector sees the effective cadence so its debounce spans real time.
    fn paced(config: SensorConfig, caps: &Capabilities) -> SensorConfig {
        SensorConfig {
            poll_interval_ms: effective_poll_ms(config.poll_interval_ms, caps.min_poll_interval_ms),
            ..config
        }
    }
}

pub struct SensorFusionManager {
    slots: [Option<SensorSlot>; MAX_SLOTS],
    policy: FusionPolicy,
    measurement_slot: Option<usize>,
    decision: EdgeCounter,
    combined: CombinedStatus,
    suspended: Option<[bool; MAX_SLOTS]>,
}

impl Default for SensorFusionManager {
    fn default() -> Self {
        Self::new(FusionPolicy::default())
    }
}

impl std::fmt::Debug for SensorFusionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorFusionManager")
            .field("slots", &self.slots)
            .field("policy", &self.policy)
            .field("measurement_slot", &self.measurement_slot)
            .field("combined", &self.combined)
            .finish_non_exhaustive()
    }
}

impl SensorFusionManager {
    pub fn new(policy: FusionPolicy) -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            policy,
            measurement_slot: None,
            decision: EdgeCounter::default(),
            combined: CombinedStatus::idle(policy),
            suspended: None,
        }
    }

    /// Install a sensor. Marking it primary un-marks any previous primary.
    pub fn add_sensor(
        &mut self,
        slot: usize,
        config: SensorConfig,
        name: impl Into<String>,
        is_primary: bool,
        source: BoxedSource,
    ) -> Result<(), EngineError> {
        if slot >= MAX_SLOTS {
            return Err(EngineError::SlotOutOfRange(slot));
        }
        if self.slots[slot].is_some() {
            return Err(EngineError::SlotOccupied(slot));
        }
        config.validate()?;
        let capabilities = source.capabilities();
        let paced = SensorSlot::paced(config, &capabilities);
        let detector = PerSensorDetector::new(paced)?.with_slot(slot);
        let name = name.into();
        if paced.poll_interval_ms != config.poll_interval_ms {
            debug!(
                slot,
                requested_ms = config.poll_interval_ms,
                effective_ms = paced.poll_interval_ms,
                "poll interval raised to source minimum"
            );
        }
        if is_primary {
            self.clear_primary();
        }
        debug!(slot, name = %name, kind = capabilities.kind.name(), is_primary, "sensor added");
        self.slots[slot] = Some(SensorSlot {
            name,
            detector,
            source,
            capabilities,
            enabled: true,
            is_primary,
            poll_interval_ms: paced.poll_interval_ms,
            last_poll_ms: None,
            status: None,
        });
        Ok(())
    }

    /// Uninstall a sensor and hand its source back.
    pub fn remove_sensor(&mut self, slot: usize) -> Result<BoxedSource, EngineError> {
        self.slot_mut(slot)?;
        let removed = self.slots[slot].take().ok_or(EngineError::SlotEmpty(slot))?;
        if self.measurement_slot == Some(slot) {
            self.measurement_slot = None;
        }
        if let Some(mask) = self.suspended.as_mut() {
            mask[slot] = false;
        }
        debug!(slot, name = %removed.name, "sensor removed");
        Ok(removed.source)
    }

    /// Toggle participation. Re-enabling starts the slot from a clean window.
    pub fn set_enabled(&mut self, slot: usize, enabled: bool) -> Result<(), EngineError> {
        let s = self.slot_mut(slot)?;
        if s.enabled == enabled {
            return Ok(());
        }
        s.enabled = enabled;
        s.restart();
        debug!(slot, enabled, "sensor participation changed");
        Ok(())
    }

    pub fn set_primary(&mut self, slot: usize) -> Result<(), EngineError> {
        self.slot_mut(slot)?;
        self.clear_primary();
        if let Some(s) = self.slots[slot].as_mut() {
            s.is_primary = true;
        }
        Ok(())
    }

    /// Designate the slot that reports distance under `TriggerMeasure`.
    pub fn set_measurement_slot(&mut self, slot: Option<usize>) -> Result<(), EngineError> {
        if let Some(idx) = slot {
            self.slot_mut(idx)?;
        }
        self.measurement_slot = slot;
        Ok(())
    }

    pub fn set_policy(&mut self, policy: FusionPolicy) {
        if policy != self.policy {
            debug!(from = self.policy.name(), to = policy.name(), "fusion policy changed");
        }
        self.policy = policy;
    }

    /// Apply a new configuration to one slot. On error nothing changes.
    pub fn reconfigure(&mut self, slot: usize, config: SensorConfig) -> Result<(), EngineError> {
        config.validate()?;
        let s = self.slot_mut(slot)?;
        let paced = SensorSlot::paced(config, &s.capabilities);
        s.detector.reconfigure(paced)?;
        s.poll_interval_ms = paced.poll_interval_ms;
        s.last_poll_ms = None;
        s.status = None;
        Ok(())
    }

    pub fn set_sample_window_size(&mut self, slot: usize, size: u8) -> Result<(), EngineError> {
        let s = self.slot_mut(slot)?;
        let before = s.detector.config().sample_window_size;
        s.detector.set_sample_window_size(size)?;
        if before != size {
            s.status = None;
        }
        Ok(())
    }

    pub fn set_detection_threshold(&mut self, slot: usize, threshold_mm: u32) -> Result<(), EngineError> {
        let s = self.slot_mut(slot)?;
        s.detector.set_detection_threshold(threshold_mm)?;
        s.status = None;
        Ok(())
    }

    /// Per-cycle entry point: poll every enabled, ready and due slot, then fuse.
    pub fn update(&mut self, now_ms: u64) -> &CombinedStatus {
        for entry in &mut self.slots {
            let Some(slot) = entry.as_mut() else {
                continue;
            };
            if !slot.enabled {
                continue;
            }
            if !slot.source.is_ready() {
                // A warming source contributes nothing rather than stale data.
                slot.status = None;
                continue;
            }
            if !slot.is_due(now_ms) {
                continue;
            }
            let reading = match slot.source.poll() {
                Ok(r) => r,
                Err(e) => {
                    let fault = classify_source_error(e.as_ref());
                    warn!(slot = slot.detector.slot(), %fault, "source poll failed; treating as absent");
                    Reading::Absent
                }
            };
            slot.last_poll_ms = Some(now_ms);
            slot.status = Some(slot.detector.update(RawSample::new(reading, now_ms)));
        }
        self.combined = self.fuse(now_ms);
        &self.combined
    }

    fn fuse(&mut self, now_ms: u64) -> CombinedStatus {
        let mut active = 0usize;
        let mut detecting = 0usize;
        let mut nearest_detecting: Option<u32> = None;
        let mut nearest_any: Option<u32> = None;
        for status in self.slots.iter().flatten().filter_map(SensorSlot::participating) {
            active += 1;
            let d = status.filtered_distance_mm;
            nearest_any = Some(nearest_any.map_or(d, |n| n.min(d)));
            if status.motion_detected {
                detecting += 1;
                nearest_detecting = Some(nearest_detecting.map_or(d, |n| n.min(d)));
            }
        }
        let any = detecting > 0;
        let all = active > 0 && detecting == active;
        let reference = self.reference_status();
        let mut nearest = nearest_detecting.or(nearest_any);
        let mut direction = reference.map_or(Direction::Stationary, |s| s.direction);

        let decision = match self.policy {
            FusionPolicy::Any => any,
            FusionPolicy::All => all,
            FusionPolicy::TriggerMeasure => {
                let gate = reference.is_some_and(|s| s.motion_detected);
                let report = if gate {
                    self.measurement_status(reference.map(|s| s.slot)).or(reference)
                } else {
                    reference
                };
                if let Some(r) = report {
                    nearest = Some(r.filtered_distance_mm);
                    direction = r.direction;
                }
                gate
            }
            FusionPolicy::Independent => reference.is_some_and(|s| s.motion_detected),
        };

        if self.decision.observe(decision) == Edge::Rising {
            info!(
                policy = self.policy.name(),
                events = self.decision.count(),
                nearest_mm = ?nearest,
                direction = %direction,
                "motion decision raised"
            );
        }
        trace!(active, detecting, decision, "fusion cycle");

        CombinedStatus {
            policy: self.policy,
            motion_detected: decision,
            any_motion_detected: any,
            all_motion_detected: all,
            active_sensor_count: active,
            detecting_sensor_count: detecting,
            nearest_distance_mm: nearest,
            primary_direction: direction,
            combined_event_count: self.decision.count(),
            updated_at_ms: now_ms,
        }
    }

    /// Primary's status when it participates, else the first participating slot's.
    fn reference_status(&self) -> Option<PerSensorStatus> {
        let participating = self
            .slots
            .iter()
            .flatten()
            .filter_map(|s| s.participating().map(|st| (s.is_primary, *st)));
        let mut first = None;
        for (is_primary, status) in participating {
            if is_primary {
                return Some(status);
            }
            first.get_or_insert(status);
        }
        first
    }

    /// Explicit measurement slot if it participates; otherwise the first
    /// participating slot other than the reference.
    fn measurement_status(&self, reference: Option<usize>) -> Option<PerSensorStatus> {
        match self.measurement_slot {
            Some(idx) if Some(idx) != reference => self.slots[idx]
                .as_ref()
                .and_then(SensorSlot::participating)
                .copied(),
            Some(_) => None,
            None => self
                .slots
                .iter()
                .flatten()
                .filter_map(SensorSlot::participating)
                .find(|s| Some(s.slot) != reference)
                .copied(),
        }
    }

    /// Check that the installed sensors make sense for the active policy.
    pub fn validate_topology(&self) -> Result<(), EngineError> {
        let primaries = self.slots.iter().flatten().filter(|s| s.is_primary).count();
        if primaries > 1 {
            return Err(EngineError::InvalidTopology("more than one primary sensor"));
        }
        if let Some(idx) = self.measurement_slot {
            match self.slots[idx].as_ref() {
                None => return Err(EngineError::InvalidTopology("measurement slot is empty")),
                Some(s) if s.is_primary => {
                    return Err(EngineError::InvalidTopology(
                        "measurement slot must not be the primary",
                    ));
                }
                Some(_) => {}
            }
        }
        if self.policy == FusionPolicy::TriggerMeasure {
            if primaries == 0 {
                return Err(EngineError::InvalidTopology(
                    "trigger_measure requires a primary sensor",
                ));
            }
            if self.enabled_count() < 2 {
                return Err(EngineError::InvalidTopology(
                    "trigger_measure requires at least two enabled sensors",
                ));
            }
        }
        Ok(())
    }

    /// True when every enabled slot's source is ready.
    pub fn all_ready(&self) -> bool {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.enabled)
            .all(SensorSlot::is_ready)
    }

    /// Disable every slot ahead of a low-power period.
    pub fn suspend(&mut self) {
        if self.suspended.is_some() {
            return;
        }
        let mut mask = [false; MAX_SLOTS];
        for (idx, entry) in self.slots.iter_mut().enumerate() {
            if let Some(s) = entry.as_mut() {
                mask[idx] = s.enabled;
                s.enabled = false;
                s.status = None;
            }
        }
        debug!(?mask, "sensors suspended");
        self.suspended = Some(mask);
    }

    /// Re-enable what `suspend` disabled; detectors restart from fresh samples.
    pub fn resume(&mut self) {
        let Some(mask) = self.suspended.take() else {
            return;
        };
        for (idx, entry) in self.slots.iter_mut().enumerate() {
            if let Some(s) = entry.as_mut()
                && mask[idx]
            {
                s.enabled = true;
                s.restart();
            }
        }
        debug!(?mask, "sensors resumed");
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.suspended.is_some()
    }

    /// Zero the combined and per-slot event counters.
    pub fn reset_event_counts(&mut self) {
        self.decision.reset_count();
        self.combined.combined_event_count = 0;
        for s in self.slots.iter_mut().flatten() {
            s.detector.reset_events();
        }
    }

    #[inline]
    pub fn combined(&self) -> &CombinedStatus {
        &self.combined
    }

    /// This cycle's per-slot statuses; `None` for empty, disabled or
    /// not-ready slots.
    pub fn statuses(&self) -> [Option<PerSensorStatus>; MAX_SLOTS] {
        std::array::from_fn(|i| {
            self.slots[i]
                .as_ref()
                .and_then(SensorSlot::participating)
                .copied()
        })
    }

    pub fn slot(&self, slot: usize) -> Option<&SensorSlot> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn slots(&self) -> impl Iterator<Item = (usize, &SensorSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    #[inline]
    pub fn policy(&self) -> FusionPolicy {
        self.policy
    }

    #[inline]
    pub fn measurement_slot(&self) -> Option<usize> {
        self.measurement_slot
    }

    pub fn primary_slot(&self) -> Option<usize> {
        self.slots().find(|(_, s)| s.is_primary).map(|(i, _)| i)
    }

    pub fn sensor_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn enabled_count(&self) -> usize {
        self.slots.iter().flatten().filter(|s| s.enabled).count()
    }

    /// Fastest effective poll interval among enabled slots.
    pub fn fastest_poll_ms(&self) -> Option<u32> {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.enabled)
            .map(|s| s.poll_interval_ms)
            .min()
    }

    fn clear_primary(&mut self) {
        for s in self.slots.iter_mut().flatten() {
            s.is_primary = false;
        }
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut SensorSlot, EngineError> {
        self.slots
            .get_mut(slot)
            .ok_or(EngineError::SlotOutOfRange(slot))?
            .as_mut()
            .ok_or(EngineError::SlotEmpty(slot))
    }
}
