//! ContextRunner — the public entry point for sequential and parallel
//! runs over a resolved settings list.
//!
//! Sequential operations (`run`, `local`, `sudo`, `execute`) apply the
//! operation one target at a time, in order. The `multi*` variants fan
//! out through the worker pool engine with bounded parallelism.

use std::sync::Arc;
use std::time::Duration;

use muster_types::{HostSettings, Response, ResponseList, SettingsList};

use crate::config::RunnerConfig;
use crate::error::{EngineError, EngineResult};
use crate::operation::Operation;
use crate::pool::{run_pool, PoolConfig, WaitFor};
use crate::resolver::SettingsResolver;
use crate::transport::{LocalTransport, Transport};

/// Per-call options for the `multi*` operations.
#[derive(Debug, Clone)]
pub struct MultiRunOptions {
    /// Override the runner's configured pool size.
    pub pool_size: Option<usize>,
    /// Per-target failures are warnings; the run always proceeds to
    /// completion. Defaults to true for parallel runs.
    pub warn_only: bool,
    /// Single-line progress reporting.
    pub condensed: bool,
    /// Deadline for discarding laggards.
    pub laggard_timeout: Option<Duration>,
    /// Responses required before the laggard deadline binds strictly.
    pub wait_for: Option<WaitFor>,
}

impl Default for MultiRunOptions {
    fn default() -> Self {
        Self {
            pool_size: None,
            warn_only: true,
            condensed: false,
            laggard_timeout: None,
            wait_for: None,
        }
    }
}

/// Runs operations against the targets a context tuple resolves to.
pub struct ContextRunner {
    contexts: Vec<String>,
    settings: SettingsList,
    transport: Arc<dyn Transport>,
    config: RunnerConfig,
}

impl ContextRunner {
    /// Resolve `contexts` and build a runner over the result.
    pub fn new(
        resolver: &dyn SettingsResolver,
        contexts: &[String],
        transport: Arc<dyn Transport>,
        config: RunnerConfig,
    ) -> Self {
        let settings = resolver.resolve(contexts);
        Self {
            contexts: contexts.to_vec(),
            settings,
            transport,
            config,
        }
    }

    /// Build a runner over an already-resolved settings list.
    pub fn from_settings(
        settings: SettingsList,
        transport: Arc<dyn Transport>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            contexts: Vec::new(),
            settings,
            transport,
            config,
        }
    }

    /// The resolved targets this runner executes against.
    pub fn settings(&self) -> &SettingsList {
        &self.settings
    }

    /// The context tuple this runner was built from.
    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }

    /// Derive a runner over the targets matching `filter`, keeping the
    /// transport and configuration.
    pub fn select<F>(&self, filter: F) -> ContextRunner
    where
        F: Fn(&HostSettings) -> bool,
    {
        let settings = self
            .settings
            .iter()
            .filter(|s| filter(s))
            .cloned()
            .collect();
        ContextRunner {
            contexts: self.contexts.clone(),
            settings,
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }

    /// Run a shell command on every target, one at a time, in order.
    pub async fn run(&self, command: &str) -> EngineResult<ResponseList> {
        self.execute(&Operation::shell(command)).await
    }

    /// Run an operation on every target, one at a time, in order.
    ///
    /// In warn-only mode a per-target failure is recorded as a `Failed`
    /// response and the run continues; otherwise the run aborts after
    /// reporting the first failure.
    pub async fn execute(&self, operation: &Operation) -> EngineResult<ResponseList> {
        self.sequential(operation, self.transport.as_ref()).await
    }

    /// Run a shell command locally once per target, sequentially.
    pub async fn local(&self, command: &str) -> EngineResult<ResponseList> {
        self.sequential(&Operation::shell(command), &LocalTransport)
            .await
    }

    /// Run a sudo-wrapped shell command on every target, sequentially.
    pub async fn sudo(&self, command: &str, user: Option<&str>) -> EngineResult<ResponseList> {
        self.run(&sudo_command(command, user)).await
    }

    /// Run a shell command on every target in parallel.
    pub async fn multirun(
        &self,
        command: &str,
        options: &MultiRunOptions,
    ) -> EngineResult<ResponseList> {
        self.multi_execute(Operation::shell(command), Arc::clone(&self.transport), options)
            .await
    }

    /// Run an arbitrary operation on every target in parallel.
    pub async fn multi_execute(
        &self,
        operation: Operation,
        transport: Arc<dyn Transport>,
        options: &MultiRunOptions,
    ) -> EngineResult<ResponseList> {
        if self.settings.is_empty() {
            return Ok(ResponseList::new(SettingsList::new()));
        }
        let config = self.pool_config(options);
        run_pool(operation, self.settings.clone(), transport, &config).await
    }

    /// Run a shell command locally in parallel, once per target.
    pub async fn multilocal(
        &self,
        command: &str,
        options: &MultiRunOptions,
    ) -> EngineResult<ResponseList> {
        self.multi_execute(Operation::shell(command), Arc::new(LocalTransport), options)
            .await
    }

    /// Run a sudo-wrapped shell command on every target in parallel.
    pub async fn multisudo(
        &self,
        command: &str,
        user: Option<&str>,
        options: &MultiRunOptions,
    ) -> EngineResult<ResponseList> {
        self.multirun(&sudo_command(command, user), options).await
    }

    async fn sequential(
        &self,
        operation: &Operation,
        transport: &dyn Transport,
    ) -> EngineResult<ResponseList> {
        let mut responses = ResponseList::new(self.settings.clone());
        for (index, target) in self.settings.iter().enumerate() {
            match operation.apply(target, transport).await {
                Ok(output) => {
                    responses.set(index, Response::Completed(output))?;
                }
                Err(err) => {
                    if self.config.warn_only {
                        tracing::warn!(
                            host = %target.host_string,
                            error = %err,
                            "operation failed; continuing"
                        );
                        responses.set(index, Response::Failed(err.to_string()))?;
                    } else {
                        tracing::error!(
                            host = %target.host_string,
                            error = %err,
                            "operation failed; aborting run"
                        );
                        return Err(EngineError::Aborted {
                            host: target.host_string.clone(),
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
        Ok(responses)
    }

    fn pool_config(&self, options: &MultiRunOptions) -> PoolConfig {
        PoolConfig {
            pool_size: options.pool_size.unwrap_or(self.config.pool_size),
            child_timeout: self.config.child_timeout,
            warn_only: options.warn_only,
            condensed: options.condensed || self.config.condensed,
            laggard_timeout: options.laggard_timeout,
            wait_for: options.wait_for,
        }
    }
}

/// Wrap a command for execution under sudo, optionally as another user.
fn sudo_command(command: &str, user: Option<&str>) -> String {
    match user {
        Some(user) => format!("sudo -H -u {} sh -c {}", user, shell_quote(command)),
        None => format!("sudo sh -c {}", shell_quote(command)),
    }
}

/// Single-quote a string for `sh`, escaping embedded single quotes.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
