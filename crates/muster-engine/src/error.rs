//! Engine error taxonomy.

use thiserror::Error;

use muster_types::IndexOutOfRange;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the execution engine itself.
///
/// Per-target failures are not represented here — they are recorded as
/// `Response::Failed` slots in the run's response list and never abort
/// the run on their own.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Malformed configuration, raised before any work starts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A strict-mode run aborted on the first per-target failure.
    #[error("run aborted on {host}: {reason}")]
    Aborted {
        /// Display identifier of the failing target.
        host: String,
        /// Why the target failed.
        reason: String,
    },
    /// Engine-level failure: channel setup or teardown went wrong.
    /// Fatal to the whole run.
    #[error("engine fault: {0}")]
    Fault(String),
}

impl From<IndexOutOfRange> for EngineError {
    fn from(err: IndexOutOfRange) -> Self {
        EngineError::Fault(err.to_string())
    }
}
