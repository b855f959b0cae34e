//! Line formats for cycle and sample output.

use proxi_core::{CombinedStatus, Cycle, PerSensorStatus, RunSummary, SequenceState};
use serde_json::{Value, json};

fn mm(v: Option<u32>) -> String {
    v.map_or_else(|| "-".to_string(), |mm| format!("{mm}mm"))
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

pub fn sensor_json(s: &PerSensorStatus) -> Value {
    json!({
        "slot": s.slot,
        "raw_mm": s.raw_distance_mm,
        "filtered_mm": s.filtered_distance_mm,
        "motion": s.motion_detected,
        "movement": s.movement_detected,
        "direction": s.direction.name(),
        "phase": s.phase.name(),
        "window_filled": s.window_filled,
        "t_ms": s.observed_at_ms,
    })
}

pub fn sensor_text(s: &PerSensorStatus) -> String {
    format!(
        "s{} raw={} filt={}mm motion={} dir={} phase={}",
        s.slot,
        mm(s.raw_distance_mm),
        s.filtered_distance_mm,
        yes_no(s.motion_detected),
        s.direction.name(),
        s.phase.name()
    )
}

fn combined_json(c: &CombinedStatus) -> Value {
    json!({
        "policy": c.policy.name(),
        "motion": c.motion_detected,
        "any": c.any_motion_detected,
        "all": c.all_motion_detected,
        "active": c.active_sensor_count,
        "detecting": c.detecting_sensor_count,
        "nearest_mm": c.nearest_distance_mm,
        "direction": c.primary_direction.name(),
        "events": c.combined_event_count,
    })
}

pub fn cycle_line(cycle: &Cycle, sequence: Option<SequenceState>, json: bool) -> String {
    let c = &cycle.combined;
    if json {
        let mut v = combined_json(c);
        v["cycle"] = json!(cycle.index);
        v["t_ms"] = json!(cycle.now_ms);
        v["sequence"] = json!(sequence.map(SequenceState::name));
        v["sensors"] = cycle.statuses.iter().flatten().map(sensor_json).collect();
        return v.to_string();
    }
    let mut line = format!(
        "[{:>7} ms] motion={} nearest={} dir={} events={} active={}/{}",
        cycle.now_ms,
        yes_no(c.motion_detected),
        mm(c.nearest_distance_mm),
        c.primary_direction.name(),
        c.combined_event_count,
        c.detecting_sensor_count,
        c.active_sensor_count,
    );
    if let Some(state) = sequence {
        line.push_str(&format!(" seq={}", state.name()));
    }
    for s in cycle.statuses.iter().flatten() {
        line.push_str(" | ");
        line.push_str(&sensor_text(s));
    }
    line
}

pub fn summary_line(summary: &RunSummary, approaches: Option<u32>, json: bool) -> String {
    if json {
        return json!({
            "summary": {
                "cycles": summary.cycles,
                "events": summary.events,
                "overruns": summary.overruns,
                "approaches": approaches,
                "final": combined_json(&summary.final_status),
            }
        })
        .to_string();
    }
    let mut line = format!(
        "Run complete: {} cycles, {} motion events, {} overruns",
        summary.cycles, summary.events, summary.overruns
    );
    if let Some(n) = approaches {
        line.push_str(&format!(", {n} confirmed approaches"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxi_core::{Direction, FusionPolicy, MAX_SLOTS, Phase};

    fn status() -> PerSensorStatus {
        PerSensorStatus {
            slot: 1,
            raw_distance_mm: None,
            filtered_distance_mm: 4000,
            motion_detected: false,
            movement_detected: false,
            direction: Direction::Stationary,
            phase: Phase::Idle,
            window_filled: true,
            observed_at_ms: 150,
        }
    }

    #[test]
    fn json_cycle_carries_sensors_and_nulls() {
        let mut statuses = [None; MAX_SLOTS];
        statuses[1] = Some(status());
        let cycle = Cycle {
            index: 2,
            now_ms: 150,
            combined: CombinedStatus::idle(FusionPolicy::All),
            statuses,
        };
        let v: Value = serde_json::from_str(&cycle_line(&cycle, None, true)).unwrap();
        assert_eq!(v["cycle"], 2);
        assert_eq!(v["policy"], "all");
        assert!(v["nearest_mm"].is_null());
        assert!(v["sequence"].is_null());
        assert_eq!(v["sensors"][0]["slot"], 1);
        assert!(v["sensors"][0]["raw_mm"].is_null());
    }

    #[test]
    fn text_cycle_lists_each_sensor() {
        let mut statuses = [None; MAX_SLOTS];
        statuses[1] = Some(status());
        let cycle = Cycle {
            index: 0,
            now_ms: 0,
            combined: CombinedStatus::idle(FusionPolicy::Any),
            statuses,
        };
        let line = cycle_line(&cycle, Some(SequenceState::FarOnly), false);
        assert!(line.contains("motion=no"));
        assert!(line.contains("seq=far_only"));
        assert!(line.contains("s1 raw=- filt=4000mm"));
    }
}
