//! Human-readable error descriptions and structured JSON error formatting.

use vehicle_core::{BuildError, CoreError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingAccelerometer
            | BuildError::MissingPresenceSensor
            | BuildError::MissingLightSensor
            | BuildError::MissingRangeFinder => format!(
                "What happened: The controller could not start ({be}).\nLikely causes: A sensor driver failed to initialize or was not passed to the builder.\nHow to fix: Check the [hardware] section and the sensor wiring, then rerun `vehicle self-check`."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/vehicle.toml for a sample."
            ),
            BuildError::Spawn { task, reason } => format!(
                "What happened: The {task} task could not be started ({reason}).\nLikely causes: Thread limit reached or the system is out of memory.\nHow to fix: Free system resources or raise the process thread limit (ulimit -u)."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CoreError>() {
        if matches!(ce, CoreError::SensorTimeout | CoreError::LockTimeout) {
            return format!(
                "What happened: {ce}.\nLikely causes: Sensor not wired correctly, bus contention, or a timeout configured too low.\nHow to fix: Verify the wiring and power, then consider raising hardware.ranging_timeout_ms or accel.read_lock_ms."
            );
        }
        return format!(
            "What happened: {ce}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing read permission.\nHow to fix: Pass an existing file with --config, or omit it to use built-in defaults. Original: {msg}"
        );
    }

    if lower.starts_with("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this program.\nLikely causes: A typo, or a value of the wrong type (e.g. a quoted number).\nHow to fix: Compare against etc/vehicle.toml. Original: {msg}"
        );
    }

    if lower.contains("must be") || lower.contains("must exceed") || lower.contains("strictly increasing") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: An out-of-range value in the TOML.\nHow to fix: Edit the named key and try again."
        );
    }

    if lower.contains("open presence pin") || lower.contains("open ultrasonic pins") || lower.contains("gpio") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [hardware] pin values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("crash notifier") {
        return format!(
            "What happened: The crash notification sink could not be opened.\nLikely causes: hardware.notifier_path points to a missing device or a read-only location.\nHow to fix: Fix or remove hardware.notifier_path. Original: {msg}"
        );
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

/// Stable machine-readable category for `--json` error output.
pub fn error_reason(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "invalid_config",
            BuildError::Spawn { .. } => "spawn",
            _ => "missing_sensor",
        };
    }
    if err.downcast_ref::<CoreError>().is_some() {
        return "sensor";
    }
    let lower = err.to_string().to_ascii_lowercase();
    if lower.starts_with("read config") || lower.starts_with("parse config") {
        "config"
    } else if lower.contains("must be") || lower.contains("must exceed") || lower.contains("strictly increasing") {
        "invalid_config"
    } else if lower.starts_with("self-check failed") {
        "self_check"
    } else {
        "error"
    }
}

pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": error_reason(err),
        "message": err.to_string(),
    })
    .to_string()
}
