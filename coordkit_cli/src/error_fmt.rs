//! Human-readable error descriptions, exit codes and structured JSON errors.

use coordkit_core::CoordError;
use coordkit_traits::LocationErrorCode;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(ce) = err.downcast_ref::<CoordError>() {
        return match ce {
            CoordError::InvalidArgument(msg) => format!(
                "What happened: Invalid input ({msg}).\nLikely causes: A non-finite or negative number, or an out-of-range sample index.\nHow to fix: Check the command-line values and rerun."
            ),
            CoordError::TransformFailure(msg) => format!(
                "What happened: The coordinate could not be transformed ({msg}).\nLikely causes: The point lies outside the target projection's valid area, or a CRS definition is malformed.\nHow to fix: Check the x/y order (x = longitude/easting) and the proj4 string with `coordkit crs show CODE`."
            ),
            CoordError::PositionUnavailable(msg) => format!(
                "What happened: No usable position was collected ({msg}).\nLikely causes: Every fix was less accurate than sampling.max_accuracy_m, or the collection window was too short.\nHow to fix: Move to open sky, lengthen --collection-ms, or raise sampling.max_accuracy_m in the config."
            ),
            CoordError::Provider(le) => match le.code {
                LocationErrorCode::PermissionDenied => "What happened: Access to location was denied.\nLikely causes: The location source refused the request.\nHow to fix: Grant location permission and try again.".to_string(),
                LocationErrorCode::Timeout => format!(
                    "What happened: The location source timed out ({}).\nLikely causes: No fix within sampling.capture_timeout_ms, or the provider has stopped.\nHow to fix: Raise the timeout in the config or check the provider.",
                    le.message
                ),
                LocationErrorCode::PositionUnavailable => format!(
                    "What happened: The location source failed ({}).\nLikely causes: The receiver lost its fix, or a fixture ran out of rows.\nHow to fix: Check the provider settings under [provider] and rerun.",
                    le.message
                ),
            },
            CoordError::Cancelled => "What happened: The operation was cancelled.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Rerun the command to start a new session.".to_string(),
            CoordError::UnknownCrs(code) => format!(
                "What happened: CRS EPSG:{code} is not known.\nLikely causes: A typo in the code, or a definition missing from [[crs.definitions]].\nHow to fix: List known codes with `coordkit crs list`, or add the definition to the config."
            ),
            CoordError::RecordNotFound(id) => format!(
                "What happened: No record with id {id}.\nLikely causes: The record was deleted or the id is mistyped.\nHow to fix: Use an id from the current record list."
            ),
            CoordError::InvalidState(msg) => format!(
                "What happened: {msg}.\nLikely causes: The session was not in a phase that accepts this command.\nHow to fix: Re-run with --log-level=debug to see the phase transitions."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("fixture csv must have headers") {
        return "Invalid headers in fixture CSV. Expected 'latitude,longitude,accuracy'.".to_string();
    }

    if lower.contains("fixture") && (lower.contains("row") || lower.contains("open")) {
        return format!(
            "What happened: The fixture CSV could not be used ({msg}).\nLikely causes: A missing file, an empty file, or a non-numeric value.\nHow to fix: Point --fixture or provider.fixture at a CSV with latitude,longitude,accuracy rows."
        );
    }

    if lower.contains("invalid configuration")
        || lower.contains("parse config")
        || lower.contains("read config")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: A malformed TOML file or out-of-range values.\nHow to fix: Edit the config file, then rerun."
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

/// Stable exit codes per error kind; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<CoordError>() {
        Some(CoordError::InvalidArgument(_)) => 2,
        Some(CoordError::TransformFailure(_)) => 3,
        Some(CoordError::PositionUnavailable(_)) => 4,
        Some(CoordError::Provider(_)) => 5,
        Some(CoordError::UnknownCrs(_) | CoordError::RecordNotFound(_)) => 6,
        Some(CoordError::Cancelled) => 130,
        Some(CoordError::InvalidState(_)) | None => 1,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<CoordError>() {
        Some(CoordError::InvalidArgument(_)) => "InvalidArgument",
        Some(CoordError::TransformFailure(_)) => "TransformFailure",
        Some(CoordError::PositionUnavailable(_)) => "PositionUnavailable",
        Some(CoordError::Provider(_)) => "ProviderError",
        Some(CoordError::Cancelled) => "Cancelled",
        Some(CoordError::InvalidState(_)) => "InvalidState",
        Some(CoordError::UnknownCrs(_)) => "UnknownCrs",
        Some(CoordError::RecordNotFound(_)) => "RecordNotFound",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = reason_name(err);
    let msg = humanize(err);
    let obj = match err.downcast_ref::<CoordError>() {
        Some(CoordError::Provider(le)) => json!({
            "reason": reason,
            "details": { "code": le.code.as_u8(), "name": le.code.name() },
            "message": msg,
        }),
        Some(CoordError::UnknownCrs(code)) => json!({
            "reason": reason,
            "details": { "code": code },
            "message": msg,
        }),
        _ => json!({ "reason": reason, "message": msg }),
    };
    obj.to_string()
}
