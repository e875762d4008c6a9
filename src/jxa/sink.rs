//! Destinations for the free-form `logs` text reported by scripts.
//!
//! The executor is handed a sink explicitly. When none is given it uses
//! [`DiscardSink`], so script logs cost nothing unless someone asked for them.

/// Receives diagnostic logs reported by successful scripts.
pub trait ScriptLogSink: Send + Sync {
    /// Emits one block of script logs.
    fn emit(&self, logs: &str);
}

/// Drops all script logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl ScriptLogSink for DiscardSink {
    fn emit(&self, _logs: &str) {}
}

/// Forwards script logs to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ScriptLogSink for TracingSink {
    fn emit(&self, logs: &str) {
        tracing::debug!("JXA script logs:\n{logs}");
    }
}
