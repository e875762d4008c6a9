//! Runs JXA scripts through `osascript` and applies the envelope contract.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::jxa::envelope;
use crate::jxa::error::{JxaError, JxaResult};
use crate::jxa::sink::{DiscardSink, ScriptLogSink};

/// Interpreter used when none is configured.
pub const DEFAULT_INTERPRETER: &str = "osascript";

/// Value of the `-l` flag selecting the JavaScript dialect.
const LANGUAGE: &str = "JavaScript";

/// Apple Events error `errAEEventNotPermitted`, printed by `osascript`
/// when the user has not granted automation permission.
const NOT_PERMITTED_CODE: &str = "(-1743)";

/// Executes JXA scripts as one-shot subprocesses.
///
/// An executor holds no mutable state; clones share the log sink and can be
/// used from concurrent tasks.
#[derive(Clone)]
pub struct Executor {
    /// Interpreter binary.
    interpreter: PathBuf,
    /// Destination for `logs` of successful scripts.
    sink: Arc<dyn ScriptLogSink>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("interpreter", &self.interpreter)
            .finish_non_exhaustive()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Creates an executor using `osascript` and discarding script logs.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interpreter(DEFAULT_INTERPRETER)
    }

    /// Creates an executor using the given interpreter binary.
    #[must_use]
    pub fn with_interpreter(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            sink: Arc::new(DiscardSink),
        }
    }

    /// Sets the sink receiving script logs.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ScriptLogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the interpreter binary.
    #[must_use]
    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Runs `script` with positional `args` and returns the envelope's `data`.
    ///
    /// The arguments are handed to the interpreter as separate argv entries
    /// and reach the script as `argv` in `run(argv)`. Cancelling `cancel`
    /// kills the interpreter.
    ///
    /// # Errors
    ///
    /// Returns a [`JxaError`] classifying the failure; see
    /// [`JxaError::kind`].
    pub async fn execute<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        script: &str,
        args: &[S],
    ) -> JxaResult<Value> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();

        if cancel.is_cancelled() {
            return Err(JxaError::Cancelled { args });
        }

        let program = self.interpreter.display().to_string();

        let mut command = Command::new(&self.interpreter);
        command
            .arg("-l")
            .arg(LANGUAGE)
            .arg("-e")
            .arg(script)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::trace!(interpreter = %program, arg_count = args.len(), "Spawning JXA script");

        let child = command.spawn().map_err(|source| JxaError::Spawn {
            program: program.clone(),
            source,
            args: args.clone(),
        })?;

        // Dropping the wait future drops the child, and kill_on_drop reaps it.
        let output = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::debug!(interpreter = %program, "JXA script cancelled");
                return Err(JxaError::Cancelled { args });
            }

            result = child.wait_with_output() => result.map_err(|source| JxaError::Wait {
                program,
                source,
                args: args.clone(),
            })?,
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            if combined.contains(NOT_PERMITTED_CODE) {
                return Err(JxaError::PermissionDenied {
                    message: combined.trim().to_string(),
                    logs: None,
                    args,
                });
            }
            return Err(JxaError::Exit {
                status: output.status,
                output: combined,
                args,
            });
        }

        envelope::interpret(&combined, &args, self.sink.as_ref())
    }

    /// Like [`execute`](Self::execute), but gives up after `timeout`.
    ///
    /// Whichever comes first of the deadline and `cancel` ends the call.
    ///
    /// # Errors
    ///
    /// Returns [`JxaError::TimedOut`] when the deadline expires, otherwise
    /// the same errors as [`execute`](Self::execute).
    pub async fn execute_with_timeout<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        timeout: Duration,
        script: &str,
        args: &[S],
    ) -> JxaResult<Value> {
        match tokio::time::timeout(timeout, self.execute(cancel, script, args)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs_f64(), "JXA script timed out");
                Err(JxaError::TimedOut {
                    timeout,
                    args: args.iter().map(|a| a.as_ref().to_string()).collect(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jxa::error::ErrorKind;

    #[test]
    fn default_uses_osascript() {
        let executor = Executor::default();
        assert_eq!(executor.interpreter(), Path::new("osascript"));
    }

    #[test]
    fn debug_shows_interpreter() {
        let executor = Executor::with_interpreter("/usr/bin/osascript");
        assert!(format!("{executor:?}").contains("/usr/bin/osascript"));
    }

    #[tokio::test]
    async fn cancelled_token_fails_without_spawning() {
        // A nonexistent interpreter would fail with Spawn if it were started.
        let executor = Executor::with_interpreter("/nonexistent/osascript");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = executor
            .execute(&cancel, "function run() {}", &["a"])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.args(), ["a".to_string()]);
    }

    #[tokio::test]
    async fn missing_interpreter_is_subprocess_failure() {
        let executor = Executor::with_interpreter("/nonexistent/osascript");
        let err = executor
            .execute::<&str>(&CancellationToken::new(), "function run() {}", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Subprocess);
        assert!(err.to_string().contains("/nonexistent/osascript"));
    }
}
