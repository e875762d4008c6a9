//! JXA (JavaScript for Automation) script execution.
//!
//! Every call spawns one `osascript -l JavaScript -e <script> <args...>`
//! process and reads back a single JSON Response Envelope:
//!
//! ```text
//!  caller ──script, args──▶ Executor ──argv──▶ osascript ──▶ Mail.app
//!    ▲                         │
//!    └──── data | JxaError ◀───┘ envelope (stdout)
//! ```
//!
//! # Modules
//!
//! - [`executor`]: subprocess invocation, cancellation and deadlines
//! - [`envelope`]: the `{success, data, error, errorCode, logs}` contract
//! - [`error`]: the error taxonomy and [`ErrorKind`]
//! - [`sink`]: where script `logs` go
//! - [`startup`]: the launch-time connectivity check

pub mod envelope;
pub mod error;
pub mod executor;
pub mod sink;
pub mod startup;

pub use error::{ErrorKind, JxaError, JxaResult};
pub use executor::Executor;
pub use sink::{DiscardSink, ScriptLogSink, TracingSink};
pub use startup::{startup_check, startup_check_with_timeout, StartupError, STARTUP_TIMEOUT};
