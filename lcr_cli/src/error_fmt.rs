//! Human-readable error descriptions, exit codes and structured JSON errors.

use lcr_core::error::{AbortReason, AcqError, BuildError};
use lcr_core::{FaultKind, RunOutcome};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingLink | BuildError::MissingChamber | BuildError::MissingTrajectory => {
                format!(
                    "What happened: The acquisition loop could not be assembled ({be}).\nLikely causes: A device failed to initialize.\nHow to fix: Re-run `lcrchar self-check` and review the log."
                )
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ae) = err.downcast_ref::<AcqError>() {
        if let AcqError::Abort(reason) = ae {
            return match reason {
                AbortReason::ChamberLink => "What happened: The temperature chamber reported a data link error.\nLikely causes: Chamber cable unplugged or the controller stopped responding.\nHow to fix: Check the chamber connection and start a new run.".to_string(),
                AbortReason::LcrLink(FaultKind::Desync) => "What happened: A corrupted frame broke the LCR meter stream.\nLikely causes: Electrical noise on the serial line or a wrong baud rate.\nHow to fix: Check lcr.baud and the cable, then start a new run.".to_string(),
                AbortReason::LcrLink(FaultKind::FrameLoss) => "What happened: LCR meter frames went missing.\nLikely causes: Serial buffer overrun or a frame period that does not match the meter.\nHow to fix: Check lcr.frame_period_s and lcr.byte_time_s against the meter, then start a new run.".to_string(),
                AbortReason::LcrLink(FaultKind::Stale) => "What happened: The LCR meter stopped sending data.\nLikely causes: Meter switched off, data output disabled, or cable unplugged.\nHow to fix: Enable the meter's serial output, then start a new run.".to_string(),
                AbortReason::ConfigurationChanged => "What happened: The LCR meter's frequency or measured quantities changed during the run.\nLikely causes: A front-panel key was pressed mid-run.\nHow to fix: Leave the meter settings untouched and start a new run.".to_string(),
                AbortReason::Cancelled => "What happened: The run was cancelled.\nLikely causes: Ctrl-C.\nHow to fix: Nothing to fix; data recorded so far was saved.".to_string(),
            };
        }
        if matches!(ae, AcqError::Timeout) {
            return "What happened: A device read timed out.\nLikely causes: Device unpowered or wrong port.\nHow to fix: Verify lcr.port and power, then rerun.".to_string();
        }
        // Fallback to generic for other runtime errors
        return format!(
            "What happened: {ae}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let chain = format!("{err:#}").to_ascii_lowercase();

    if chain.contains("without the `hardware` feature") {
        return format!(
            "What happened: {msg}.\nLikely causes: lcr.port is set in a simulation-only build.\nHow to fix: Remove lcr.port to simulate, or rebuild with `--features hardware`."
        );
    }

    if chain.contains("opening lcr link") {
        return format!(
            "What happened: Failed to open the LCR serial port.\nLikely causes: Wrong lcr.port, port in use, or insufficient permissions.\nHow to fix: Fix lcr.port in the config; ensure the user may access the device.\nDetails: {chain}"
        );
    }

    if chain.contains("reading config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path.\nHow to fix: Point --config at an existing TOML file.\nDetails: {chain}"
        );
    }

    if chain.contains("invalid configuration") || chain.contains("parsing config") {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: Unknown keys, wrong types, or out-of-range values.\nHow to fix: Edit the TOML config and try again.\nDetails: {chain}"
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

/// Exit code of a run that ended with `outcome`.
pub fn exit_code_for_outcome(outcome: RunOutcome) -> i32 {
    match outcome {
        RunOutcome::NormalCompletion => 0,
        RunOutcome::ChamberLinkFault => 3,
        RunOutcome::LcrLinkFault => 4,
        RunOutcome::ConfigurationChanged => 5,
        RunOutcome::Cancelled => 6,
        RunOutcome::Interrupted => 1,
    }
}

/// Map AbortReason (if present) to stable exit codes; other errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(AcqError::Abort(reason)) = err.downcast_ref::<AcqError>() {
        return exit_code_for_outcome(RunOutcome::from_reason(*reason));
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(AcqError::Abort(reason)) = err.downcast_ref::<AcqError>() {
        let outcome = RunOutcome::from_reason(*reason);
        let obj = match reason {
            AbortReason::LcrLink(kind) => json!({
                "reason": outcome.name(),
                "details": { "fault": kind.name() },
                "message": humanize(err),
            }),
            _ => json!({ "reason": outcome.name(), "message": humanize(err) }),
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "error", "message": humanize(err) }).to_string()
}
