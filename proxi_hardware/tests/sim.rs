use std::time::Duration;

use proxi_hardware::{
    PIR, PresencePattern, SimulatedPir, SimulatedUltrasonic, TraceSample, TraceSource, ULTRASONIC,
    WalkProfile, replay_of,
};
use proxi_traits::clock::{Clock, ManualClock};
use proxi_traits::{Capabilities, RangeSource, Reading};
use rstest::rstest;

fn quiet_walk() -> WalkProfile {
    WalkProfile {
        noise_mm: 0,
        ..WalkProfile::default()
    }
}

#[rstest]
#[case(0, Some(3500))]
#[case(1192, Some(1950))]
#[case(2384, Some(400))]
#[case(3383, Some(400))]
#[case(3384, None)]
#[case(4383, None)]
#[case(4384, Some(3500))]
fn walk_profile_cycles(#[case] t_ms: u64, #[case] expected: Option<u32>) {
    let walk = quiet_walk();
    assert_eq!(walk.approach_ms(), 2384);
    assert_eq!(walk.period_ms(), 4384);
    assert_eq!(walk.distance_at(t_ms), expected);
}

#[test]
fn simulated_ultrasonic_follows_the_clock() {
    let clock = ManualClock::new();
    let mut src = SimulatedUltrasonic::new(quiet_walk(), ULTRASONIC, clock.clone());
    assert!(src.is_ready());
    assert_eq!(src.poll().unwrap(), Reading::Distance(3500));

    clock.set_ms(2384);
    assert_eq!(src.poll().unwrap(), Reading::Distance(400));

    clock.set_ms(3500);
    assert_eq!(src.poll().unwrap(), Reading::Absent);
}

#[test]
fn noise_stays_within_amplitude() {
    let clock = ManualClock::new();
    let walk = WalkProfile {
        noise_mm: 25,
        hold_ms: 100_000,
        ..WalkProfile::default()
    };
    let mut src = SimulatedUltrasonic::new(walk, ULTRASONIC, clock.clone());
    clock.set_ms(3000);
    let mut seen_distinct = std::collections::BTreeSet::new();
    for _ in 0..200 {
        let mm = src.poll().unwrap().distance_mm().expect("holding at 400");
        assert!((375..=425).contains(&mm), "{mm} outside noise band");
        seen_distinct.insert(mm);
    }
    assert!(seen_distinct.len() > 5);
}

#[test]
fn readings_outside_capabilities_are_absent() {
    let clock = ManualClock::new();
    let walk = WalkProfile {
        start_mm: 5000,
        end_mm: 10,
        noise_mm: 0,
        ..WalkProfile::default()
    };
    let mut src = SimulatedUltrasonic::new(walk, ULTRASONIC, clock.clone());
    // 5 m is past the 4 m ceiling
    assert_eq!(src.poll().unwrap(), Reading::Absent);
    // holding at 10 mm is under the 20 mm floor
    clock.set_ms(walk.approach_ms());
    assert_eq!(src.poll().unwrap(), Reading::Absent);
}

#[test]
fn same_seed_same_noise() {
    let walk = WalkProfile::default();
    let a_clock = ManualClock::new();
    let b_clock = ManualClock::new();
    let mut a = SimulatedUltrasonic::new(walk, ULTRASONIC, a_clock.clone());
    let mut b = SimulatedUltrasonic::new(walk, ULTRASONIC, b_clock.clone());
    for step in 0..40 {
        a_clock.set_ms(step * 75);
        b_clock.set_ms(step * 75);
        assert_eq!(a.poll().unwrap(), b.poll().unwrap());
    }
}

#[test]
fn different_seeds_diverge() {
    let clock = ManualClock::new();
    let walk = WalkProfile {
        noise_mm: 50,
        ..WalkProfile::default()
    };
    let mut a = SimulatedUltrasonic::new(walk, ULTRASONIC, clock.clone());
    let mut b = SimulatedUltrasonic::new(WalkProfile { seed: walk.seed ^ 1, ..walk }, ULTRASONIC, clock);
    let a: Vec<Reading> = (0..20).map(|_| a.poll().unwrap()).collect();
    let b: Vec<Reading> = (0..20).map(|_| b.poll().unwrap()).collect();
    assert_ne!(a, b);
}

#[test]
fn pir_warms_up_then_alternates() {
    let clock = ManualClock::new();
    let caps = Capabilities {
        warmup_ms: 1000,
        ..PIR
    };
    let pattern = PresencePattern {
        idle_ms: 500,
        active_ms: 300,
        presence_mm: 1200,
    };
    let mut pir = SimulatedPir::new(pattern, caps, clock.clone());
    assert!(!pir.is_ready());
    assert_eq!(pir.poll().unwrap(), Reading::Absent);

    clock.set_ms(1000);
    assert!(pir.is_ready());
    assert_eq!(pir.poll().unwrap(), Reading::Absent);

    clock.set_ms(1500);
    assert_eq!(pir.poll().unwrap(), Reading::Distance(1200));
    clock.set_ms(1799);
    assert_eq!(pir.poll().unwrap(), Reading::Distance(1200));
    clock.set_ms(1800);
    assert_eq!(pir.poll().unwrap(), Reading::Absent);
}

fn trace(rows: &[(u64, Option<u32>)]) -> Vec<TraceSample> {
    rows.iter()
        .map(|&(t_ms, mm)| TraceSample {
            t_ms,
            reading: Reading::from(mm),
        })
        .collect()
}

#[test]
fn trace_source_holds_the_newest_row() {
    let clock = ManualClock::new();
    let rows = trace(&[(100, Some(3000)), (200, Some(2500)), (300, None), (400, Some(900))]);
    let mut src = TraceSource::new(rows, replay_of(ULTRASONIC), clock.clone()).with_linger_ms(50);
    assert_eq!(src.len(), 4);

    // before the first row
    assert_eq!(src.poll().unwrap(), Reading::Absent);

    clock.set_ms(150);
    assert_eq!(src.poll().unwrap(), Reading::Distance(3000));
    clock.set_ms(200);
    assert_eq!(src.poll().unwrap(), Reading::Distance(2500));
    clock.set_ms(350);
    assert_eq!(src.poll().unwrap(), Reading::Absent);
    clock.sleep(Duration::from_millis(100));
    assert_eq!(src.poll().unwrap(), Reading::Distance(900));
    assert!(!src.is_finished());

    clock.set_ms(451);
    assert!(src.is_finished());
    assert_eq!(src.poll().unwrap(), Reading::Absent);
}

#[test]
fn empty_trace_is_finished_immediately() {
    let clock = ManualClock::new();
    let mut src = TraceSource::new(Vec::new(), replay_of(ULTRASONIC), clock);
    assert!(src.is_empty());
    assert!(src.is_finished());
    assert_eq!(src.poll().unwrap(), Reading::Absent);
}
