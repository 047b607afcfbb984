//! Human-readable error descriptions and structured JSON error formatting.

use heater_core::error::{BuildError, HeaterError};

use crate::commands::FaultExit;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(f) = err.downcast_ref::<FaultExit>() {
        return format!(
            "What happened: Sanity watchdog latched a fault on: {}.\nLikely causes: Heater element detached from its block, sensor fallen off or unplugged, or a stuck output stage.\nHow to fix: Inspect wiring and mounting of the listed heaters, then restart; a fault only clears on re-initialisation.",
            f.heaters.join(", ")
        );
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingHeaters => {
                "What happened: No heaters are configured.\nLikely causes: The config has no [[heater]] tables.\nHow to fix: Add at least one [[heater]] with name and pin.".to_string()
            }
            BuildError::TooManyHeaters(n) => format!(
                "What happened: {n} heaters configured, more than supported.\nLikely causes: Duplicated [[heater]] blocks.\nHow to fix: Keep at most {} heaters.",
                heater_config::MAX_HEATERS
            ),
            BuildError::DuplicateName(name) => format!(
                "What happened: Heater name {name:?} is used twice.\nLikely causes: Copy-pasted [[heater]] block.\nHow to fix: Give every heater a unique name."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(he) = err.downcast_ref::<HeaterError>() {
        return match he {
            HeaterError::UnknownHeaterName(name) => format!(
                "What happened: No heater named {name:?}.\nLikely causes: Typo in --target/--detach or the heater is missing from the config.\nHow to fix: Run `heaterctl show` to list configured heaters."
            ),
            HeaterError::GainOutOfRange { kind, value } => {
                let (lo, hi) = kind.bounds();
                format!(
                    "What happened: Gain {kind} = {value} cannot be represented.\nLikely causes: Value given in user units or with a wrong sign.\nHow to fix: Use an internal fixed-point value in {lo}..={hi}."
                )
            }
            HeaterError::Timeout => {
                "What happened: Actuator write timed out.\nLikely causes: Output driver not responding or bus congestion.\nHow to fix: Check the heater driver wiring and power.".to_string()
            }
            HeaterError::Actuator(msg) | HeaterError::ActuatorFault(msg) => format!(
                "What happened: Actuator error ({msg}).\nLikely causes: Wrong pin in the config or missing GPIO permissions.\nHow to fix: Fix the heater pin and make sure the process may access GPIO."
            ),
            HeaterError::Storage(msg) => format!(
                "What happened: Gains file could not be read or written ({msg}).\nLikely causes: Wrong storage.gains_file path, permissions, or a hand-edited file with bad syntax.\nHow to fix: Fix or delete the gains file; configured gains are used when it is absent."
            ),
            HeaterError::Config(msg) => format!(
                "What happened: {msg}.\nLikely causes: Missing section in the config.\nHow to fix: Edit the config file, then rerun."
            ),
            HeaterError::UnknownHeater(_) => format!(
                "What happened: {he}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Config loader errors carry the key path in the message.
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();
    if lower.starts_with("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path.\nHow to fix: Pass --config <FILE>. Original: {msg}"
        );
    }
    if lower.starts_with("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this schema.\nLikely causes: Typo in a key or a value of the wrong type.\nHow to fix: Compare with etc/heater_config.toml. Original: {msg}"
        );
    }
    if lower.contains("must") || lower.contains("duplicate") || lower.contains("unknown") {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 heater fault, 4 configuration, 5 actuator, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<FaultExit>().is_some() {
        return 3;
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 4;
    }
    match err.downcast_ref::<HeaterError>() {
        Some(HeaterError::Actuator(_) | HeaterError::ActuatorFault(_) | HeaterError::Timeout) => 5,
        Some(_) => 4,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<FaultExit>().is_some() {
        return "HeaterFault";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<HeaterError>() {
        Some(HeaterError::UnknownHeater(_) | HeaterError::UnknownHeaterName(_)) => "UnknownHeater",
        Some(HeaterError::GainOutOfRange { .. }) => "GainOutOfRange",
        Some(HeaterError::Actuator(_) | HeaterError::ActuatorFault(_)) => "Actuator",
        Some(HeaterError::Timeout) => "Timeout",
        Some(HeaterError::Storage(_)) => "Storage",
        Some(HeaterError::Config(_)) => "InvalidConfig",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    let details = if let Some(f) = err.downcast_ref::<FaultExit>() {
        Some(json!({ "heaters": f.heaters }))
    } else if let Some(HeaterError::GainOutOfRange { kind, value }) =
        err.downcast_ref::<HeaterError>()
    {
        let (lo, hi) = kind.bounds();
        Some(json!({ "gain": kind.name(), "value": value, "min": lo, "max": hi }))
    } else {
        None
    };

    let obj = match details {
        Some(d) => json!({ "reason": reason_name(err), "details": d, "message": msg }),
        None => json!({ "reason": reason_name(err), "message": msg }),
    };
    obj.to_string()
}
