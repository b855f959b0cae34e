//! `self-check`: configuration, topology and one poll per source.

use std::io::Write;

use eyre::Result;
use proxi_config::Config;
use proxi_traits::{RangeSource, Reading};
use proxi_traits::clock::MonotonicClock;
use serde_json::json;

use crate::sources::{assemble, build_sequence, open_all};

pub fn self_check(cfg: &Config, json: bool) -> Result<()> {
    let clock = MonotonicClock::new();
    let mut opened = open_all(cfg, &clock)?;
    let mut out = std::io::stdout().lock();

    for (s, source) in &mut opened {
        let ready = source.is_ready();
        let caps = source.capabilities();
        let reading = match source.poll() {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(slot = s.slot, error = %e, "self-check poll failed");
                Reading::Absent
            }
        };
        if json {
            writeln!(
                out,
                "{}",
                json!({
                    "slot": s.slot,
                    "name": s.display_name(),
                    "kind": caps.kind.name(),
                    "enabled": s.enabled,
                    "ready": ready,
                    "reading_mm": reading.distance_mm(),
                })
            )?;
        } else {
            let shown = reading
                .distance_mm()
                .map_or_else(|| "absent".to_string(), |mm| format!("{mm} mm"));
            writeln!(
                out,
                "slot {} {} ({}): {}, reading {}",
                s.slot,
                s.display_name(),
                caps.kind.name(),
                if ready { "ready" } else { "warming up" },
                shown
            )?;
        }
    }

    let manager = assemble(cfg, opened)?;
    build_sequence(cfg)?;
    if json {
        writeln!(
            out,
            "{}",
            json!({ "self_check": "ok", "policy": manager.policy().name(), "sensors": manager.sensor_count() })
        )?;
    } else {
        writeln!(
            out,
            "Self-check OK: {} sensors, policy {}",
            manager.sensor_count(),
            manager.policy().name()
        )?;
    }
    Ok(())
}
