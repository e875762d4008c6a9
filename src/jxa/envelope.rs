//! The Response Envelope every script must print.
//!
//! ```json
//! {"success": true,  "data": {...}, "logs": "optional"}
//! {"success": false, "error": "message", "errorCode": "OPTIONAL_CODE", "logs": "optional"}
//! ```
//!
//! The envelope is the only channel from a script back to the server.
//! Output that is not such an object is an error of its own class.

use serde_json::{Map, Value};

use crate::jxa::error::{JxaError, JxaResult, UNKNOWN_ERROR};
use crate::jxa::sink::ScriptLogSink;

/// `errorCode` reported when Mail.app is not running.
pub const ERROR_CODE_NOT_RUNNING: &str = "MAIL_APP_NOT_RUNNING";

/// `errorCode` reported when automation of Mail.app is not permitted.
pub const ERROR_CODE_NO_PERMISSIONS: &str = "MAIL_APP_NO_PERMISSIONS";

/// Applies the envelope contract to captured script output.
///
/// Returns the `data` value on success. Non-empty `logs` of a successful
/// run go to `sink`; on failure they are appended to the error instead.
pub(crate) fn interpret(output: &str, args: &[String], sink: &dyn ScriptLogSink) -> JxaResult<Value> {
    if output.trim().is_empty() {
        return Err(JxaError::EmptyOutput {
            args: args.to_vec(),
        });
    }

    let mut envelope: Map<String, Value> =
        serde_json::from_str(output).map_err(|source| JxaError::InvalidJson {
            source,
            output: output.to_string(),
            args: args.to_vec(),
        })?;

    let Some(success) = envelope.get("success").and_then(Value::as_bool) else {
        return Err(JxaError::MissingSuccess {
            output: output.to_string(),
            args: args.to_vec(),
        });
    };

    let logs = non_empty_str(&envelope, "logs").map(str::to_string);

    if !success {
        let message =
            non_empty_str(&envelope, "error").map_or_else(|| UNKNOWN_ERROR.to_string(), str::to_string);
        let args = args.to_vec();

        return Err(match non_empty_str(&envelope, "errorCode") {
            Some(ERROR_CODE_NOT_RUNNING) => JxaError::MailNotRunning {
                message,
                logs,
                args,
            },
            Some(ERROR_CODE_NO_PERMISSIONS) => JxaError::PermissionDenied {
                message,
                logs,
                args,
            },
            code => JxaError::Script {
                message,
                code: code.map(str::to_string),
                logs,
                args,
            },
        });
    }

    let Some(data) = envelope.remove("data") else {
        return Err(JxaError::MissingData {
            output: output.to_string(),
            args: args.to_vec(),
        });
    };

    if let Some(logs) = logs {
        sink.emit(&logs);
    }

    Ok(data)
}

fn non_empty_str<'a>(envelope: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    envelope
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
