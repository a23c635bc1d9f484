//! muster-engine: bounded-concurrency command execution over many hosts.
//!
//! This crate provides:
//!
//! - **Pool**: the worker pool engine — fixed-size fan-out/fan-in with
//!   deadline-based laggard discarding
//! - **Runner**: the `ContextRunner` facade for sequential and parallel runs
//! - **Transport**: how a shell command reaches a target (local `sh`, ssh)
//! - **Operation**: shell-command vs. callable work units
//! - **Resolver**: symbolic contexts to concrete host settings
//! - **Config**: process-wide runner defaults

pub mod config;
pub mod error;
pub mod operation;
pub mod pool;
mod progress;
pub mod resolver;
pub mod runner;
pub mod transport;

pub use config::RunnerConfig;
pub use error::{EngineError, EngineResult};
pub use operation::{CallOperation, Operation};
pub use pool::{run_pool, PoolConfig, WaitFor};
pub use resolver::{MemoResolver, SettingsResolver, StaticResolver};
pub use runner::{ContextRunner, MultiRunOptions};
pub use transport::{LocalTransport, SshTransport, Transport, TransportError};

// Re-export the data types alongside the engine for convenience.
pub use muster_types::{
    CommandOutput, HostSettings, IndexOutOfRange, Response, ResponseList, SettingsList,
};
