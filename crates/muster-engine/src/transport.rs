//! Transport — how a shell command reaches a target.
//!
//! The engine treats transports as opaque: `execute(settings, command)`
//! either yields a [`CommandOutput`] or a [`TransportError`]. Two
//! implementations are provided:
//!
//! - [`LocalTransport`]: runs the command in a local `sh -c` subprocess.
//! - [`SshTransport`]: shells out to the `ssh` binary with the target's
//!   user, host, and port.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use muster_types::{CommandOutput, HostSettings};

/// Errors from running a command against one target.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The command process could not be started.
    #[error("failed to spawn command: {0}")]
    Spawn(String),
    /// I/O failure while talking to the process or the target.
    #[error("io error: {0}")]
    Io(String),
    /// The operation itself reported a failure.
    #[error("{0}")]
    Operation(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Executes one shell command against one target.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run `command` on the target described by `settings`, capturing
    /// output. A nonzero exit code is a successful execution with a
    /// failing output, not a transport error.
    async fn execute(
        &self,
        settings: &HostSettings,
        command: &str,
    ) -> Result<CommandOutput, TransportError>;
}

/// Runs commands in a local `sh -c` subprocess, ignoring the target's
/// connection fields.
#[derive(Debug, Clone, Default)]
pub struct LocalTransport;

#[async_trait]
impl Transport for LocalTransport {
    async fn execute(
        &self,
        _settings: &HostSettings,
        command: &str,
    ) -> Result<CommandOutput, TransportError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| TransportError::Spawn(format!("sh: {}", e)))?;
        Ok(output_to_command_output(output))
    }
}

/// Runs commands over the system `ssh` binary.
///
/// BatchMode is forced so a missing key fails fast instead of prompting;
/// extra arguments (identity files, options) can be appended per
/// transport.
#[derive(Debug, Clone, Default)]
pub struct SshTransport {
    /// Extra arguments inserted before the destination.
    pub extra_args: Vec<String>,
}

impl SshTransport {
    /// Transport with no extra ssh arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an extra ssh argument (e.g. `-i`, a key path).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn execute(
        &self,
        settings: &HostSettings,
        command: &str,
    ) -> Result<CommandOutput, TransportError> {
        let destination = match &settings.user {
            Some(user) => format!("{}@{}", user, settings.host),
            None => settings.host.clone(),
        };
        let output = Command::new("ssh")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-p")
            .arg(settings.port.to_string())
            .args(&self.extra_args)
            .arg(destination)
            .arg(command)
            .output()
            .await
            .map_err(|e| TransportError::Spawn(format!("ssh: {}", e)))?;
        Ok(output_to_command_output(output))
    }
}

fn output_to_command_output(output: std::process::Output) -> CommandOutput {
    let code = output.status.code().unwrap_or(1) as i64;
    CommandOutput::from_output(
        code,
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_transport_captures_stdout() {
        let settings = HostSettings::new("ignored");
        let output = LocalTransport
            .execute(&settings, "echo hello")
            .await
            .expect("spawn sh");
        assert!(output.ok());
        assert_eq!(output.out.trim(), "hello");
    }

    #[tokio::test]
    async fn local_transport_reports_exit_code() {
        let settings = HostSettings::new("ignored");
        let output = LocalTransport
            .execute(&settings, "exit 3")
            .await
            .expect("spawn sh");
        assert_eq!(output.code, 3);
        assert!(!output.ok());
    }

    #[test]
    fn ssh_transport_builds_extra_args() {
        let transport = SshTransport::new().arg("-i").arg("/tmp/key");
        assert_eq!(transport.extra_args, vec!["-i", "/tmp/key"]);
    }
}
