//! User-facing error message formatting.
//!
//! Uses typed error matching (FetchError variants, io::ErrorKind) rather than
//! string parsing to produce short, actionable messages for the column panes.

use crate::error::{FetchError, LoadError, PermalinkError};
use std::io;

/// Message shown in place of a column's table when its dataset failed to load.
pub fn user_message_from_load(err: &LoadError) -> String {
    let reason = match &err.cause {
        FetchError::Status(404) => "Dataset not found.".to_string(),
        FetchError::Status(code) => format!("Server returned status {}.", code),
        FetchError::Io(io_err) => user_message_from_io(io_err, None),
        FetchError::Transport(msg) => format!("Network error: {}", msg),
        FetchError::InvalidPath(_) => "Invalid dataset path.".to_string(),
    };
    format!("Failed to load {}: {} ({})", err.locator, reason, err.path)
}

/// Message shown when a permalink was discarded.
pub fn user_message_from_permalink(err: &PermalinkError) -> String {
    let reason = match err {
        PermalinkError::Base64(_) | PermalinkError::Json(_) => {
            "the link is corrupt or truncated".to_string()
        }
        PermalinkError::IncompleteColumn { index } => {
            format!("column {} has no complete dataset selection", index + 1)
        }
        PermalinkError::ColorOutOfRange { token, .. } => {
            format!("highlight {:?} uses an unknown color", token)
        }
    };
    format!("Permalink ignored: {}. Starting with an empty board.", reason)
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::ConnectionRefused => "Connection refused.".to_string(),
        ErrorKind::ConnectionReset => "Connection reset.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "File is not valid UTF-8 text.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::Interrupted => "Operation interrupted.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find a LoadError, PermalinkError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report) -> String {
    for cause in report.chain() {
        if let Some(load) = cause.downcast_ref::<LoadError>() {
            return user_message_from_load(load);
        }
        if let Some(permalink) = cause.downcast_ref::<PermalinkError>() {
            return user_message_from_permalink(permalink);
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return user_message_from_io(io_err, None);
        }
    }

    // Fallback: use first line of display to avoid long tracebacks
    let display = report.to_string();
    display
        .lines()
        .next()
        .unwrap_or("An error occurred")
        .trim()
        .to_string()
}
