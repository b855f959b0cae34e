use proptest::prelude::*;
use proxi_core::mocks::ScriptedSource;
use proxi_core::{EngineError, FusionPolicy, MAX_SLOTS, PerSensorDetector, SensorConfig, SensorFusionManager};
use proxi_traits::{RawSample, Reading};

fn reading_strategy() -> impl Strategy<Value = Reading> {
    prop_oneof![
        4 => (20u32..=4000).prop_map(Reading::Distance),
        1 => Just(Reading::Absent),
    ]
}

#[derive(Debug, Clone)]
enum SlotOp {
    Add(usize),
    Remove(usize),
    Toggle(usize),
}

fn slot_op() -> impl Strategy<Value = SlotOp> {
    let idx = 0usize..MAX_SLOTS + 2;
    prop_oneof![
        idx.clone().prop_map(SlotOp::Add),
        idx.clone().prop_map(SlotOp::Remove),
        idx.prop_map(SlotOp::Toggle),
    ]
}

proptest! {
    #[test]
    fn filtered_distance_stays_within_sensor_range(
        readings in prop::collection::vec(reading_strategy(), 1..200),
        size in 3u8..=20,
    ) {
        let cfg = SensorConfig { sample_window_size: size, ..SensorConfig::default() };
        let mut det = PerSensorDetector::new(cfg).unwrap();
        for (i, r) in readings.into_iter().enumerate() {
            let s = det.update(RawSample::new(r, i as u64 * 75));
            prop_assert!(s.filtered_distance_mm >= cfg.min_range_mm);
            prop_assert!(s.filtered_distance_mm <= cfg.max_range_mm);
            // motion is only ever reported inside the zone
            prop_assert!(!s.motion_detected || s.filtered_distance_mm <= cfg.detection_threshold_mm);
            prop_assert!(det.window().len() <= usize::from(size));
        }
    }

    #[test]
    fn event_count_equals_rising_edges(
        readings in prop::collection::vec(reading_strategy(), 1..120),
    ) {
        let cfg = SensorConfig {
            sample_window_size: 3,
            direction_detection_enabled: false,
            ..SensorConfig::default()
        };
        let mut m = SensorFusionManager::new(FusionPolicy::Any);
        let n = readings.len();
        m.add_sensor(0, cfg, "p", true, Box::new(ScriptedSource::new(readings))).unwrap();

        let mut prev = false;
        let mut rises = 0u32;
        for i in 0..n {
            let c = *m.update(i as u64 * 75);
            if c.motion_detected && !prev {
                rises += 1;
            }
            prev = c.motion_detected;
            prop_assert_eq!(c.combined_event_count, rises);
        }
    }

    #[test]
    fn slot_table_matches_a_simple_model(ops in prop::collection::vec(slot_op(), 1..60)) {
        let mut m = SensorFusionManager::new(FusionPolicy::Any);
        // None = empty, Some(enabled)
        let mut model: [Option<bool>; MAX_SLOTS] = [None; MAX_SLOTS];
        for op in ops {
            match op {
                SlotOp::Add(i) => {
                    let r = m.add_sensor(
                        i,
                        SensorConfig::default(),
                        "s",
                        false,
                        Box::new(ScriptedSource::new(Vec::<Reading>::new())),
                    );
                    match model.get(i).copied() {
                        None => prop_assert_eq!(r, Err(EngineError::SlotOutOfRange(i))),
                        Some(Some(_)) => prop_assert_eq!(r, Err(EngineError::SlotOccupied(i))),
                        Some(None) => {
                            prop_assert!(r.is_ok());
                            model[i] = Some(true);
                        }
                    }
                }
                SlotOp::Remove(i) => {
                    let r = m.remove_sensor(i).map(|_| ());
                    match model.get(i).copied() {
                        None => prop_assert_eq!(r, Err(EngineError::SlotOutOfRange(i))),
                        Some(None) => prop_assert_eq!(r, Err(EngineError::SlotEmpty(i))),
                        Some(Some(_)) => {
                            prop_assert!(r.is_ok());
                            model[i] = None;
                        }
                    }
                }
                SlotOp::Toggle(i) => {
                    let want = !model.get(i).copied().flatten().unwrap_or(false);
                    let r = m.set_enabled(i, want);
                    match model.get(i).copied() {
                        None => prop_assert_eq!(r, Err(EngineError::SlotOutOfRange(i))),
                        Some(None) => prop_assert_eq!(r, Err(EngineError::SlotEmpty(i))),
                        Some(Some(_)) => {
                            prop_assert!(r.is_ok());
                            model[i] = Some(want);
                        }
                    }
                }
            }
            prop_assert_eq!(m.sensor_count(), model.iter().flatten().count());
            prop_assert_eq!(m.enabled_count(), model.iter().flatten().filter(|e| **e).count());
        }
    }
}
