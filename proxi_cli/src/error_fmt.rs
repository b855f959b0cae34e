//! Human-readable error descriptions and structured JSON error formatting.

use proxi_core::error::EngineError;
use proxi_hardware::HwError;

/// Find the first error of type `E` anywhere in the report's chain.
fn find<E: std::error::Error + 'static>(err: &eyre::Report) -> Option<&E> {
    err.chain().find_map(|e| e.downcast_ref::<E>())
}

/// Innermost message; config validation puts the offending key there.
fn root_message(err: &eyre::Report) -> String {
    err.root_cause().to_string()
}

/// Short stable name for the failure class, used as the JSON `reason`.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if find::<HwError>(err).is_some() {
        return "Hardware";
    }
    if let Some(e) = find::<EngineError>(err) {
        return match e {
            EngineError::InvalidTopology(_) | EngineError::InvalidSequence(_) => "Topology",
            _ => "Engine",
        };
    }
    if find::<toml::de::Error>(err).is_some() {
        return "Config";
    }
    let msg = format!("{err:#}").to_ascii_lowercase();
    if msg.contains("trace csv") {
        "Trace"
    } else if msg.contains("invalid configuration") || msg.contains("read config") {
        "Config"
    } else {
        "Error"
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(hw) = find::<HwError>(err) {
        return match hw {
            HwError::EchoTimeout => "What happened: An ultrasonic echo never ended.\nLikely causes: Echo line shorted high, wrong echo pin, or the module browned out.\nHow to fix: Check [sensors.pins] trigger/echo numbers and the module's 5V supply; a 3.3V divider on echo is required on a Pi.".to_string(),
            HwError::Gpio(msg) => format!(
                "What happened: GPIO could not be opened ({msg}).\nLikely causes: Pin already in use, wrong pin number, or no permission for /dev/gpiomem.\nHow to fix: Fix [sensors.pins] in the config and run as a user in the gpio group."
            ),
            HwError::Io(e) => format!(
                "What happened: Hardware I/O failed ({e}).\nLikely causes: Device unplugged or driver not loaded.\nHow to fix: Re-seat the sensor and rerun with --log-level=debug."
            ),
        };
    }

    if let Some(e) = find::<EngineError>(err) {
        return match e {
            EngineError::InvalidTopology(why) => format!(
                "What happened: The sensor layout does not fit the fusion policy ({why}).\nLikely causes: trigger_measure without a primary, or a measurement slot that is empty or primary.\nHow to fix: Adjust [engine] policy/measurement_slot or the primary flags in [[sensors]]."
            ),
            EngineError::InvalidSequence(why) => format!(
                "What happened: The [sequence] block is invalid ({why}).\nHow to fix: Point far_slot and near_slot at two different configured sensors."
            ),
            other => format!(
                "What happened: The engine rejected the configuration ({other}).\nLikely causes: A sensor value outside its allowed range.\nHow to fix: Edit the [[sensors]] entry named in the message and try again."
            ),
        };
    }

    if let Some(e) = find::<toml::de::Error>(err) {
        return format!(
            "What happened: The config file could not be parsed.\nLikely causes: A typo, an unknown policy/kind name, or a value of the wrong type.\nHow to fix: Correct the TOML near: {}",
            e.message()
        );
    }

    // String-based heuristics for errors coming from init or config
    let chain = format!("{err:#}");
    let lower = chain.to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 't_ms,distance_mm'.".to_string();
    }
    if lower.contains("trace csv") || lower.contains("invalid csv row") {
        return format!(
            "What happened: The range trace could not be used ({}).\nHow to fix: Provide a CSV with headers t_ms,distance_mm and non-decreasing t_ms.",
            root_message(err)
        );
    }
    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read ({}).\nHow to fix: Pass --config with the path to a TOML file (see etc/proxi.toml).",
            root_message(err)
        );
    }
    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Invalid configuration ({}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun.",
            root_message(err)
        );
    }

    // Generic fallback
    format!(
        "Something went wrong: {chain}\nHow to fix: Re-run with --log-level=debug for details."
    )
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
