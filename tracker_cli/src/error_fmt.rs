//! Human-readable error descriptions and structured JSON error formatting.

use tracker_core::error::{BuildError, TrackerError};

/// Every message in the report chain, outermost first.
fn chain_text(err: &eyre::Report) -> String {
    err.chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingAxisH | BuildError::MissingAxisV => {
                format!("What happened: The tracker was built without an axis ({be}).\nLikely causes: An axis light pair was not wired into the builder.\nHow to fix: Pass both axes via with_axis_h(...) and with_axis_v(...).")
            }
            BuildError::MissingLimits => {
                "What happened: No limit switches were provided to the tracker.\nLikely causes: The endstop inputs were not wired into the builder.\nHow to fix: Pass the limit switches via with_limits(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `tracker check-config`."
            ),
        };
    }

    let text = chain_text(err);
    let lower = text.to_ascii_lowercase();

    // Light trace CSV header special-case
    if lower.contains("light trace csv must have headers") {
        return "Invalid headers in light trace CSV. Expected 't_ms,h_a,h_b,v_a,v_b'.".to_string();
    }

    if let Some(io) = err
        .chain()
        .find_map(|c| c.downcast_ref::<std::io::Error>())
    {
        return format!(
            "What happened: A file could not be read ({err}: {io}).\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the path passed via --config or --trace."
        );
    }

    if let Some(te) = err
        .chain()
        .find_map(|c| c.downcast_ref::<toml::de::Error>())
    {
        return format!(
            "What happened: The config file is not valid TOML ({}).\nLikely causes: A typo, a wrong value type or an unknown section layout.\nHow to fix: Fix the TOML near the reported position; see etc/tracker_config.toml for a sample.",
            te.message().trim()
        );
    }

    if let Some(de) = err.downcast_ref::<TrackerError>() {
        return match de {
            TrackerError::Config(_) => format!(
                "What happened: The configuration is invalid ({}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `tracker check-config`.",
                err.root_cause()
            ),
            TrackerError::Timeout => {
                "What happened: Hardware did not answer in time.\nLikely causes: Limit switch or sensor bus not wired, or no power/ground.\nHow to fix: Check the [endstop] and axis pins in the config and verify the wiring.".to_string()
            }
            TrackerError::HardwareFault(msg) | TrackerError::Hardware(msg)
                if lower.contains("bridge write") =>
            {
                format!(
                    "What happened: A motor bridge write failed ({msg}).\nLikely causes: Bridge driver fault, wrong in1/in2 pins, or a stalled motor.\nHow to fix: Check the bridge wiring and the axis in1/in2 pins; both motors were stopped."
                )
            }
            TrackerError::HardwareFault(msg) | TrackerError::Hardware(msg) => format!(
                "What happened: A hardware device reported an error ({msg}).\nLikely causes: Wiring, power or pin configuration.\nHow to fix: Re-run with --log-level=debug to see which device failed."
            ),
            TrackerError::State(msg) => format!(
                "What happened: The tracker reached an unexpected state ({msg}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors from hardware seams without typed errors
    if lower.contains("timeout") {
        return "What happened: Hardware did not answer in time.\nLikely causes: Sensor or switch wiring, or no power.\nHow to fix: Verify the wiring and the pins in the config.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {err}"
    )
}

/// Stable reason tag for JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "Config",
            _ => "Build",
        };
    }
    match err.downcast_ref::<TrackerError>() {
        Some(TrackerError::Config(_)) => "Config",
        Some(TrackerError::Timeout) => "Timeout",
        Some(TrackerError::Hardware(_) | TrackerError::HardwareFault(_)) => "Hardware",
        Some(TrackerError::State(_)) => "State",
        None => "Error",
    }
}

/// Config problems exit 2, hardware problems 3, everything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "Config" => 2,
        "Timeout" | "Hardware" => 3,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
