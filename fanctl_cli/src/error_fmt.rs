//! Human-readable error descriptions and structured JSON error formatting.

use fanctl_core::{FanError, HANG_EXIT_CODE};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(fe) = err.downcast_ref::<FanError>() {
        return match fe {
            FanError::Hardware(msg) | FanError::HardwareFault(msg) => format!(
                "What happened: The fan output failed ({msg}).\nLikely causes: PWM peripheral not enabled, wrong channel, or missing permissions.\nHow to fix: Check [fan] in the config and the PWM overlay; the fan was left forced on if possible."
            ),
            FanError::Sensor(msg) => format!(
                "What happened: The temperature sensor could not be read ({msg}).\nLikely causes: Wrong thermal zone path or the zone is not readable.\nHow to fix: Check sensor.zone in the config (try `cat` on the file)."
            ),
            FanError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Backend not available in this build or out-of-range values.\nHow to fix: Edit the config file, then rerun."
            ),
            FanError::WatchdogExpired { stalled_ms } => format!(
                "What happened: The control loop stalled for {stalled_ms} ms.\nLikely causes: System overload or a blocked actuator call.\nHow to fix: Raise timing.watchdog_ms or investigate the stall with --log-level=debug."
            ),
            FanError::State(msg) => format!(
                "What happened: Internal state error ({msg}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") || lower.contains(" must be ") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Unknown section or key, or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nHow to fix: Check the --config path. Original: {msg}"
        );
    }

    if lower.contains("profile csv must have headers") {
        return "Invalid headers in profile CSV. Expected 'tick,raw'.".to_string();
    }

    if lower.contains("self-check failed") {
        return format!("{msg}\nHow to fix: Re-run with --log-level=debug to see every transition.");
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per failure class; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<FanError>() {
        Some(FanError::Hardware(_) | FanError::HardwareFault(_)) => 3,
        Some(FanError::Sensor(_)) => 4,
        Some(FanError::WatchdogExpired { .. }) => HANG_EXIT_CODE,
        Some(FanError::Config(_)) => 6,
        Some(FanError::State(_)) | None => 1,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<FanError>() {
        Some(FanError::Hardware(_)) => "Hardware",
        Some(FanError::HardwareFault(_)) => "HardwareFault",
        Some(FanError::Sensor(_)) => "Sensor",
        Some(FanError::Config(_)) => "Config",
        Some(FanError::WatchdogExpired { .. }) => "WatchdogExpired",
        Some(FanError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "message": humanize(err),
        "exit_code": exit_code_for_error(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FanError::Hardware("x".into()), 3, "Hardware")]
    #[case(FanError::Sensor("x".into()), 4, "Sensor")]
    #[case(FanError::WatchdogExpired { stalled_ms: 2500 }, 5, "WatchdogExpired")]
    #[case(FanError::Config("x".into()), 6, "Config")]
    #[case(FanError::State("x".into()), 1, "State")]
    fn typed_errors_map_to_codes(#[case] e: FanError, #[case] code: i32, #[case] name: &str) {
        let r = eyre::Report::new(e);
        assert_eq!(exit_code_for_error(&r), code);
        assert_eq!(reason_name(&r), name);
    }

    #[test]
    fn untyped_errors_are_generic() {
        let r = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&r), 1);
        assert!(humanize(&r).contains("Original: boom"));
    }

    #[test]
    fn json_error_is_parseable() {
        let r = eyre::Report::new(FanError::Sensor("zone gone".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&r)).unwrap();
        assert_eq!(v["reason"], "Sensor");
        assert_eq!(v["exit_code"], 4);
        assert!(v["message"].as_str().unwrap().contains("zone gone"));
    }
}
