//! CommandOutput — the structured result of one command execution.

/// Captured result of running a command on a single target.
///
/// Fields:
/// - `code` — exit code (0 = success)
/// - `out` — raw stdout as a string
/// - `err` — raw stderr as a string
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CommandOutput {
    /// Exit code. 0 means success.
    pub code: i64,
    /// Raw standard output as a string.
    pub out: String,
    /// Raw standard error as a string.
    pub err: String,
}

impl CommandOutput {
    /// Create a successful output with stdout.
    pub fn success(out: impl Into<String>) -> Self {
        Self {
            code: 0,
            out: out.into(),
            err: String::new(),
        }
    }

    /// Create a failed output with an error message.
    pub fn failure(code: i64, err: impl Into<String>) -> Self {
        Self {
            code,
            out: String::new(),
            err: err.into(),
        }
    }

    /// Create an output from raw streams and an exit code.
    pub fn from_output(code: i64, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            out: stdout.into(),
            err: stderr.into(),
        }
    }

    /// True if the command succeeded (exit code 0).
    pub fn ok(&self) -> bool {
        self.code == 0
    }
}

impl Default for CommandOutput {
    fn default() -> Self {
        Self::success("")
    }
}
