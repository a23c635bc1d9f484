//! Operation — what a run executes against every target.
//!
//! An operation is chosen once per run and applied identically to every
//! settings record: either a shell command string handed to the run's
//! transport, or an arbitrary callable invoked directly.

use std::sync::Arc;

use async_trait::async_trait;

use muster_types::{CommandOutput, HostSettings};

use crate::transport::{Transport, TransportError};

/// A user-supplied callable run directly against a target, bypassing the
/// transport. The target's settings are passed explicitly — callables
/// must not read ambient state, so concurrent workers never race.
#[async_trait]
pub trait CallOperation: Send + Sync {
    /// Display name used in progress output.
    fn name(&self) -> &str {
        "callable"
    }

    /// Execute against one target.
    async fn call(&self, settings: &HostSettings) -> Result<CommandOutput, TransportError>;
}

/// The work applied to every target of a run.
#[derive(Clone)]
pub enum Operation {
    /// A shell command string, executed via the run's transport.
    Shell(String),
    /// An arbitrary callable, executed directly.
    Callable(Arc<dyn CallOperation>),
}

impl Operation {
    /// Shorthand for a shell command operation.
    pub fn shell(command: impl Into<String>) -> Self {
        Operation::Shell(command.into())
    }

    /// Shorthand for a callable operation.
    pub fn callable(op: impl CallOperation + 'static) -> Self {
        Operation::Callable(Arc::new(op))
    }

    /// Apply the operation to one target.
    pub async fn apply(
        &self,
        settings: &HostSettings,
        transport: &dyn Transport,
    ) -> Result<CommandOutput, TransportError> {
        match self {
            Operation::Shell(command) => transport.execute(settings, command).await,
            Operation::Callable(op) => op.call(settings).await,
        }
    }

    /// Display label for progress output.
    pub fn label(&self) -> String {
        match self {
            Operation::Shell(command) => command.clone(),
            Operation::Callable(op) => format!("{}()", op.name()),
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Shell(command) => f.debug_tuple("Shell").field(command).finish(),
            Operation::Callable(op) => f.debug_tuple("Callable").field(&op.name()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greet;

    #[async_trait]
    impl CallOperation for Greet {
        fn name(&self) -> &str {
            "greet"
        }

        async fn call(&self, settings: &HostSettings) -> Result<CommandOutput, TransportError> {
            Ok(CommandOutput::success(format!("hi {}", settings.host)))
        }
    }

    #[tokio::test]
    async fn callable_receives_explicit_settings() {
        let op = Operation::callable(Greet);
        let settings = HostSettings::new("web1");
        let output = op
            .apply(&settings, &crate::transport::LocalTransport)
            .await
            .expect("callable succeeds");
        assert_eq!(output.out, "hi web1");
    }

    #[test]
    fn labels() {
        assert_eq!(Operation::shell("uptime").label(), "uptime");
        assert_eq!(Operation::callable(Greet).label(), "greet()");
    }
}
