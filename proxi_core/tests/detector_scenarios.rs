//! End-to-end detector behaviour over scripted reading sequences.

use proxi_core::detector::{Evidence, PerSensorDetector};
use proxi_core::direction::{Direction, TriggerDirection};
use proxi_core::status::{MotionEvent, Phase, PerSensorStatus};
use proxi_core::SensorConfig;
use proxi_traits::{RawSample, Reading};
use rstest::rstest;

fn detector(config: SensorConfig) -> PerSensorDetector {
    PerSensorDetector::new(config).unwrap()
}

/// Feed `values` (0 = absent) at the configured poll interval.
fn feed(det: &mut PerSensorDetector, start_ms: u64, values: &[u32]) -> Vec<PerSensorStatus> {
    let step = u64::from(det.config().poll_interval_ms);
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let reading = if v == 0 {
                Reading::Absent
            } else {
                Reading::Distance(v)
            };
            det.update(RawSample::new(reading, start_ms + step * i as u64))
        })
        .collect()
}

fn approach_config() -> SensorConfig {
    SensorConfig {
        detection_threshold_mm: 1500,
        sample_window_size: 5,
        // two samples of stability at this cadence
        poll_interval_ms: 200,
        ..SensorConfig::default()
    }
}

#[rstest]
#[case(3, 1234)]
#[case(5, 20)]
#[case(20, 4000)]
fn constant_input_converges_exactly(#[case] size: u8, #[case] value: u32) {
    let mut det = detector(SensorConfig {
        sample_window_size: size,
        ..SensorConfig::default()
    });
    let out = feed(&mut det, 0, &vec![value; usize::from(size)]);
    let last = out.last().unwrap();
    assert!(last.window_filled);
    assert_eq!(last.filtered_distance_mm, value);
}

#[test]
fn absent_readings_drain_a_close_object() {
    let cfg = SensorConfig::default();
    let mut det = detector(cfg);
    feed(&mut det, 0, &[500; 5]);
    let out = feed(&mut det, 375, &[0; 5]);
    let filtered: Vec<u32> = out.iter().map(|s| s.filtered_distance_mm).collect();
    assert!(filtered.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(*filtered.last().unwrap(), cfg.max_range_mm);
    assert!(out.iter().all(|s| s.raw_distance_mm.is_none()));
    assert!(!out.last().unwrap().motion_detected);
}

#[rstest]
// 3500 -> 3100: large jump
#[case(1500, 3100, true)]
// 3500 -> 3480: below every threshold
#[case(3400, 3480, false)]
fn movement_threshold_boundary(#[case] injected: u32, #[case] avg: u32, #[case] moving: bool) {
    let mut det = detector(SensorConfig::default());
    feed(&mut det, 0, &[3500; 5]);
    let s = det.update(RawSample::new(Reading::Distance(injected), 375));
    assert_eq!(s.filtered_distance_mm, avg);
    assert_eq!(s.movement_detected, moving);
}

#[test]
fn step_from_far_to_near_walks_the_average_down() {
    let mut det = detector(approach_config());
    let settled = feed(&mut det, 0, &[3500; 5]);
    assert!(settled.iter().all(|s| !s.movement_detected));

    let out = feed(&mut det, 1000, &[500; 5]);
    let filtered: Vec<u32> = out.iter().map(|s| s.filtered_distance_mm).collect();
    assert_eq!(filtered, vec![2900, 2300, 1700, 1100, 500]);
    // every post-injection step moves the mean by 600 mm
    assert!(out.iter().all(|s| s.movement_detected));
    // the raw drop beyond the threshold is gradual-approach evidence
    assert_eq!(out[0].phase, Phase::GradualApproach);
    // inside the zone, moving and confirmed approaching
    assert_eq!(out[2].direction, Direction::Approaching);
    assert!(!out[2].motion_detected);
    assert!(out[3].motion_detected);
    assert!(out[4].motion_detected);
    assert_eq!(out[3].phase, Phase::Confirmed);
    assert_eq!(det.event_count(), 1);
}

#[test]
fn gradual_evidence_survives_stationary_and_clears_on_receding() {
    let mut det = detector(approach_config());
    feed(&mut det, 0, &[3500; 5]);
    feed(&mut det, 1000, &[500; 5]);

    // mean settles: movement stops, direction confirms stationary
    let still = feed(&mut det, 2000, &[500, 500]);
    assert!(!still[0].motion_detected);
    assert_eq!(still[1].direction, Direction::Stationary);
    assert_eq!(det.evidence(), Evidence::Gradual);
    assert_eq!(det.last_event(), MotionEvent::Cleared);

    let leaving = feed(&mut det, 2400, &[4000, 4000]);
    assert_eq!(leaving[0].direction, Direction::Stationary);
    assert_eq!(det.evidence(), Evidence::None);
    assert_eq!(leaving[1].direction, Direction::Receding);
    assert_eq!(leaving[1].phase, Phase::Leaving);
    assert_eq!(det.last_event(), MotionEvent::Receding);
    assert_eq!(det.last_event_ms(), Some(2600));
}

#[test]
fn short_lived_candidate_never_reaches_reported_direction() {
    let mut det = detector(SensorConfig {
        sample_window_size: 3,
        ..SensorConfig::default()
    });
    assert_eq!(det.direction_tracker().required_samples(), 6);

    let out = feed(
        &mut det,
        0,
        &[3000, 3000, 3000, 2900, 2800, 2700, 2600, 2500],
    );
    assert!(out.iter().all(|s| s.direction == Direction::Stationary));
    assert_eq!(det.direction_tracker().candidate(), Direction::Approaching);
    assert_eq!(det.direction_tracker().stability_count(), 5);

    // a flat step resets the candidate before it confirms
    let s = det.update(RawSample::new(Reading::Distance(2700), 600));
    assert_eq!(s.filtered_distance_mm, 2600);
    assert_eq!(s.direction, Direction::Stationary);
    assert_eq!(det.direction_tracker().stability_count(), 1);
}

#[test]
fn sudden_appearance_needs_approach_after_it_appeared() {
    let cfg = SensorConfig {
        detection_threshold_mm: 1500,
        sample_window_size: 3,
        poll_interval_ms: 200,
        ..SensorConfig::default()
    };
    let mut det = detector(cfg);
    // already inside the zone from the first sample, then holds still
    let out = feed(&mut det, 0, &[1000, 1000, 1000, 1000, 1000]);
    assert!(out.iter().all(|s| !s.motion_detected));
    assert_eq!(out[2].phase, Phase::SuddenAppearanceCandidate);
    // stationary confirmation counts as the first confirmation after appearing
    assert_eq!(
        det.evidence(),
        Evidence::Sudden {
            awaiting_confirmation: false
        }
    );

    // now it comes closer: two approaching samples confirm and trigger
    let out = feed(&mut det, 1000, &[700, 400]);
    assert!(!out[0].motion_detected);
    assert!(out[1].motion_detected);
    assert_eq!(out[1].direction, Direction::Approaching);
}

fn close_range_config() -> SensorConfig {
    SensorConfig {
        detection_threshold_mm: 1500,
        sample_window_size: 3,
        poll_interval_ms: 200,
        ..SensorConfig::default()
    }
}

#[test]
fn stepping_back_inside_the_zone_rearms_the_trigger() {
    let mut det = detector(close_range_config());
    let first = feed(&mut det, 0, &[1000, 1000, 1000, 1000, 700, 400]);
    assert!(first[5].motion_detected);

    // backs off to 1300 mm without leaving the zone, then stands still
    let back = feed(&mut det, 1200, &[1300; 6]);
    assert!(back.iter().all(|s| s.filtered_distance_mm <= 1500));
    assert_eq!(back[1].direction, Direction::Receding);
    assert!(!back[1].motion_detected);
    assert_eq!(back[4].direction, Direction::Stationary);
    assert_eq!(
        det.evidence(),
        Evidence::Sudden {
            awaiting_confirmation: true
        }
    );

    // and comes forward again
    let again = feed(&mut det, 2400, &[1000, 700, 400, 100]);
    assert!(!again[0].motion_detected);
    assert!(again[1].motion_detected);
    assert_eq!(again[1].direction, Direction::Approaching);
    assert!(again[3].motion_detected);
    assert_eq!(det.event_count(), 2);
}

#[test]
fn confirmation_in_the_appearance_cycle_does_not_count() {
    let mut det = detector(close_range_config());
    // stationary is confirmed outside the zone; the drift in stays below
    // the direction sensitivity so it is neither gradual nor approaching
    let out = feed(
        &mut det,
        0,
        &[1510, 1510, 1510, 1510, 1510, 1495, 1495, 1495, 1495],
    );
    assert_eq!(out[5].filtered_distance_mm, 1505);
    assert_eq!(out[6].filtered_distance_mm, 1500);
    assert_eq!(out[8].direction, Direction::Stationary);
    assert_eq!(out[8].phase, Phase::SuddenAppearanceCandidate);
    assert_eq!(
        det.evidence(),
        Evidence::Sudden {
            awaiting_confirmation: true
        }
    );

    det.update(RawSample::new(Reading::Distance(1495), 1800));
    assert_eq!(
        det.evidence(),
        Evidence::Sudden {
            awaiting_confirmation: false
        }
    );
}

#[rstest]
#[case(TriggerDirection::Approaching, None)]
#[case(TriggerDirection::Receding, Some(5))]
#[case(TriggerDirection::Both, Some(5))]
fn leaving_triggers_only_when_configured(
    #[case] trigger: TriggerDirection,
    #[case] first_motion: Option<usize>,
) {
    let mut det = detector(SensorConfig {
        trigger_direction: trigger,
        ..close_range_config()
    });
    let out = feed(&mut det, 0, &[500, 500, 500, 800, 1100, 1400, 1700]);
    // 600 -> 800 is consistent in direction but too noisy to be movement
    assert_eq!(out[4].direction, Direction::Receding);
    assert!(!out[4].movement_detected);
    assert!(out[5].movement_detected);
    assert_eq!(out.iter().position(|s| s.motion_detected), first_motion);
    assert_eq!(det.evidence(), Evidence::None);
}

#[test]
fn rebase_suppresses_the_following_approach() {
    let base = approach_config();
    let mut plain = detector(base);
    let mut rebased = detector(SensorConfig {
        rebase_spread_mm: Some(2000),
        ..base
    });
    for det in [&mut plain, &mut rebased] {
        feed(det, 0, &[3500; 5]);
    }

    let jump_plain = plain.update(RawSample::new(Reading::Distance(500), 1000));
    let jump_rebased = rebased.update(RawSample::new(Reading::Distance(500), 1000));
    assert_eq!(jump_plain.filtered_distance_mm, 2900);
    // rebase cycle reports the seed, delta against the previous mean
    assert_eq!(jump_rebased.filtered_distance_mm, 500);
    assert!(jump_rebased.movement_detected);
    assert_eq!(rebased.window().spread(), 0);

    // the object keeps coming; only the plain window still sees movement
    let next_plain = plain.update(RawSample::new(Reading::Distance(450), 1200));
    let next_rebased = rebased.update(RawSample::new(Reading::Distance(450), 1200));
    assert!(next_plain.movement_detected);
    assert_eq!(next_rebased.filtered_distance_mm, 490);
    assert!(!next_rebased.movement_detected);
}

#[test]
fn window_resize_restarts_state() {
    let mut det = detector(approach_config());
    feed(&mut det, 0, &[3500; 5]);
    feed(&mut det, 1000, &[500; 4]);
    assert_ne!(det.evidence(), Evidence::None);

    det.set_sample_window_size(8).unwrap();
    assert!(det.window().is_empty());
    assert_eq!(det.evidence(), Evidence::None);
    assert_eq!(det.confirmed_direction(), Direction::Stationary);
    assert!(det.last_status().is_none());
    // event history survives a resize
    assert_eq!(det.event_count(), 1);

    let out = feed(&mut det, 2000, &[900; 8]);
    assert!(!out[6].window_filled);
    assert!(out[7].window_filled);
    assert_eq!(out[7].filtered_distance_mm, 900);
}
