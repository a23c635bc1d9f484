//! Runner configuration.

use std::time::Duration;

/// Process-wide defaults for a [`crate::runner::ContextRunner`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunnerConfig {
    /// Default worker pool size for parallel runs.
    pub pool_size: usize,

    /// How long an idle worker waits for its next assignment before
    /// terminating itself. Protects against an orchestrator that stops
    /// sending work.
    pub child_timeout: Duration,

    /// When true, a per-target failure in a sequential run is surfaced
    /// as a warning and the run continues. When false, the run aborts
    /// on the first failure.
    pub warn_only: bool,

    /// When true, parallel runs report progress on a single overwritten
    /// status line instead of printing per-target output.
    pub condensed: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            child_timeout: Duration::from_secs(60),
            warn_only: false,
            condensed: false,
        }
    }
}
