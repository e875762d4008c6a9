//! Error types for JXA script execution.
//!
//! Every variant carries the positional arguments of the failed call so a
//! failure can be diagnosed from the message alone, without re-running the
//! script.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Result type for JXA operations.
pub type JxaResult<T> = Result<T, JxaError>;

/// Message used when a script reports `success: false` without an `error`.
pub const UNKNOWN_ERROR: &str = "unknown error (script returned success=false with no error message)";

/// Coarse classification of a [`JxaError`].
///
/// Callers branch on this instead of matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The interpreter could not be run or exited non-zero.
    Subprocess,
    /// Clean exit without any output.
    EmptyOutput,
    /// Output was not a JSON object.
    Parse,
    /// Well-formed output that breaks the envelope rules.
    ContractViolation,
    /// The script reported `success: false`.
    Script,
    /// The script reported that Mail.app is not running.
    MailNotRunning,
    /// Automation of Mail.app is not permitted.
    PermissionDenied,
    /// The caller cancelled the call.
    Cancelled,
    /// The call exceeded its deadline.
    TimedOut,
}

/// Errors that can occur while running a JXA script.
#[derive(Debug, Error)]
pub enum JxaError {
    /// The interpreter process could not be started.
    #[error("failed to start {program}: {source}{}", args_section(.args))]
    Spawn {
        /// Interpreter that was invoked.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// Waiting for the interpreter or collecting its output failed.
    #[error("failed to collect {program} output: {source}{}", args_section(.args))]
    Wait {
        /// Interpreter that was invoked.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// The interpreter exited with a non-zero status.
    #[error(
        "osascript execution failed: {status}{}{}",
        output_section("Output", .output),
        args_section(.args)
    )]
    Exit {
        /// Exit status of the interpreter.
        status: ExitStatus,
        /// Combined stdout and stderr.
        output: String,
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// The interpreter exited cleanly but printed nothing.
    #[error("osascript returned empty output (expected JSON){}", args_section(.args))]
    EmptyOutput {
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// The output is not a JSON object.
    #[error(
        "failed to parse osascript JSON output: {source}{}{}",
        output_section("Raw output", .output),
        args_section(.args)
    )]
    InvalidJson {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// The raw output.
        output: String,
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// The envelope has no boolean `success` field.
    #[error(
        "script output missing 'success' field or invalid type{}{}",
        output_section("Output", .output),
        args_section(.args)
    )]
    MissingSuccess {
        /// The raw output.
        output: String,
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// The envelope reports success but carries no `data` field.
    #[error(
        "script output missing 'data' field{}{}",
        output_section("Output", .output),
        args_section(.args)
    )]
    MissingData {
        /// The raw output.
        output: String,
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// The script reported a failure.
    #[error(
        "JXA script error: {message}{}{}",
        logs_section(.logs.as_deref()),
        args_section(.args)
    )]
    Script {
        /// The `error` field, or [`UNKNOWN_ERROR`].
        message: String,
        /// Unrecognised `errorCode`, if any.
        code: Option<String>,
        /// Diagnostic logs reported by the script.
        logs: Option<String>,
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// The script reported that Mail.app is not running.
    #[error(
        "Mail.app is not running. Please start Mail.app and try again.\nJXA script error: {message}{}{}",
        logs_section(.logs.as_deref()),
        args_section(.args)
    )]
    MailNotRunning {
        /// Message reported by the script.
        message: String,
        /// Diagnostic logs reported by the script.
        logs: Option<String>,
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// macOS refused to let this process automate Mail.app.
    #[error(
        "Mail.app automation permission denied. Please grant permission in \
         System Settings > Privacy & Security > Automation.\nDetails: {message}{}{}",
        logs_section(.logs.as_deref()),
        args_section(.args)
    )]
    PermissionDenied {
        /// Message reported by the script or the interpreter.
        message: String,
        /// Diagnostic logs reported by the script.
        logs: Option<String>,
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// The call was cancelled before the script finished.
    #[error("script execution cancelled{}", args_section(.args))]
    Cancelled {
        /// Positional arguments of the call.
        args: Vec<String>,
    },

    /// The call exceeded its deadline; the interpreter was killed.
    #[error("script execution timed out after {}s{}", .timeout.as_secs_f64(), args_section(.args))]
    TimedOut {
        /// The deadline that expired.
        timeout: Duration,
        /// Positional arguments of the call.
        args: Vec<String>,
    },
}

impl JxaError {
    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Spawn { .. } | Self::Wait { .. } | Self::Exit { .. } => ErrorKind::Subprocess,
            Self::EmptyOutput { .. } => ErrorKind::EmptyOutput,
            Self::InvalidJson { .. } => ErrorKind::Parse,
            Self::MissingSuccess { .. } | Self::MissingData { .. } => ErrorKind::ContractViolation,
            Self::Script { .. } => ErrorKind::Script,
            Self::MailNotRunning { .. } => ErrorKind::MailNotRunning,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::TimedOut { .. } => ErrorKind::TimedOut,
        }
    }

    /// Returns the positional arguments of the failed call.
    #[must_use]
    pub fn args(&self) -> &[String] {
        match self {
            Self::Spawn { args, .. }
            | Self::Wait { args, .. }
            | Self::Exit { args, .. }
            | Self::EmptyOutput { args }
            | Self::InvalidJson { args, .. }
            | Self::MissingSuccess { args, .. }
            | Self::MissingData { args, .. }
            | Self::Script { args, .. }
            | Self::MailNotRunning { args, .. }
            | Self::PermissionDenied { args, .. }
            | Self::Cancelled { args }
            | Self::TimedOut { args, .. } => args,
        }
    }
}

fn output_section(label: &str, output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!("\n{label}: {output}")
    }
}

fn logs_section(logs: Option<&str>) -> String {
    logs.map_or_else(String::new, |logs| format!("\nLogs:\n{logs}"))
}

fn args_section(args: &[String]) -> String {
    format!("\nArguments: {args:?}")
}
