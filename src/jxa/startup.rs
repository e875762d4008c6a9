//! Startup connectivity check against Mail.app.
//!
//! Run once before the server accepts requests, so a missing permission or
//! a closed Mail.app is reported to the operator at launch instead of on the
//! first tool call.

use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::jxa::error::{ErrorKind, JxaError};
use crate::jxa::executor::Executor;

/// Upper bound for the whole check.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

const STARTUP_CHECK_SCRIPT: &str = include_str!("scripts/startup_check.js");

const NOT_RUNNING_GUIDANCE: &str = "Mail.app is not running. Start Mail.app and launch the server again.";

const PERMISSION_GUIDANCE: &str = "This process is not allowed to control Mail.app. Grant permission in \
     System Settings > Privacy & Security > Automation, then launch the server again.";

const GENERIC_GUIDANCE: &str = "This usually means either:\n\
     1. Mail.app is not running - Please start Mail.app\n\
     2. Missing automation permissions - Grant permission in System Settings > Privacy & Security > Automation";

/// Errors reported by [`startup_check`].
#[derive(Debug, Error)]
pub enum StartupError {
    /// The verification script could not be run or reported a failure.
    #[error("Mail.app connectivity check failed: {0}")]
    Connectivity(#[source] JxaError),

    /// The script succeeded but its data is not an object.
    #[error("startup check returned unexpected data type: {found}")]
    ResultShape {
        /// JSON type of the returned data.
        found: &'static str,
    },

    /// The script succeeded but did not report `running: true`.
    #[error("Mail.app is not properly accessible (startup check did not report running=true)")]
    Unavailable,
}

impl StartupError {
    /// Returns the kind of the underlying script error, if there is one.
    #[must_use]
    pub const fn jxa_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Connectivity(e) => Some(e.kind()),
            Self::ResultShape { .. } | Self::Unavailable => None,
        }
    }

    /// Returns troubleshooting advice for the operator.
    #[must_use]
    pub const fn guidance(&self) -> &'static str {
        match self.jxa_kind() {
            Some(ErrorKind::MailNotRunning) => NOT_RUNNING_GUIDANCE,
            Some(ErrorKind::PermissionDenied) => PERMISSION_GUIDANCE,
            _ => GENERIC_GUIDANCE,
        }
    }
}

/// Verifies that Mail.app is running and scriptable.
///
/// The check gives up after [`STARTUP_TIMEOUT`] even if `cancel` carries no
/// deadline; cancelling `cancel` ends it earlier.
///
/// On success, returns the reported properties, e.g. `accountCount`,
/// `version` and a nested `properties` object.
///
/// # Errors
///
/// Returns a [`StartupError`] if the script fails, returns something other
/// than an object, or does not report `running: true`.
pub async fn startup_check(
    executor: &Executor,
    cancel: &CancellationToken,
) -> Result<Map<String, Value>, StartupError> {
    startup_check_with_timeout(executor, cancel, STARTUP_TIMEOUT).await
}

/// Runs the startup check with a deadline other than [`STARTUP_TIMEOUT`].
///
/// # Errors
///
/// As for [`startup_check`]; an expired deadline surfaces as
/// [`StartupError::Connectivity`] with [`ErrorKind::TimedOut`].
pub async fn startup_check_with_timeout(
    executor: &Executor,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<Map<String, Value>, StartupError> {
    let token = cancel.child_token();

    let data = executor
        .execute_with_timeout::<&str>(&token, timeout, STARTUP_CHECK_SCRIPT, &[])
        .await
        .map_err(StartupError::Connectivity)?;

    let properties = match data {
        Value::Object(properties) => properties,
        other => {
            return Err(StartupError::ResultShape {
                found: json_type_name(&other),
            })
        }
    };

    if properties.get("running").and_then(Value::as_bool) != Some(true) {
        return Err(StartupError::Unavailable);
    }

    Ok(properties)
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_follows_envelope_convention() {
        assert!(STARTUP_CHECK_SCRIPT.contains("function run(argv)"));
        assert!(STARTUP_CHECK_SCRIPT.contains("MAIL_APP_NOT_RUNNING"));
        assert!(STARTUP_CHECK_SCRIPT.contains("MAIL_APP_NO_PERMISSIONS"));
    }

    #[test]
    fn guidance_follows_error_kind() {
        let not_running = StartupError::Connectivity(JxaError::MailNotRunning {
            message: "closed".to_string(),
            logs: None,
            args: Vec::new(),
        });
        assert_eq!(not_running.guidance(), NOT_RUNNING_GUIDANCE);

        let denied = StartupError::Connectivity(JxaError::PermissionDenied {
            message: "denied".to_string(),
            logs: None,
            args: Vec::new(),
        });
        assert_eq!(denied.guidance(), PERMISSION_GUIDANCE);

        assert_eq!(StartupError::Unavailable.guidance(), GENERIC_GUIDANCE);
    }

    #[test]
    fn connectivity_error_wraps_script_error() {
        let error = StartupError::Connectivity(JxaError::Script {
            message: "not running".to_string(),
            code: None,
            logs: None,
            args: Vec::new(),
        });
        let msg = error.to_string();
        assert!(msg.starts_with("Mail.app connectivity check failed"));
        assert!(msg.contains("not running"));
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&Value::Null), "null");
        assert_eq!(json_type_name(&serde_json::json!([1])), "array");
        assert_eq!(json_type_name(&serde_json::json!("x")), "string");
    }
}
