//! Test doubles for the muster engine.
//!
//! [`ScriptedTransport`] plays back per-host behaviors (instant output,
//! delays, failures, hangs) and instruments concurrency: tests can read
//! the in-flight high-water mark to verify the pool bound, and the call
//! log to verify which targets were dispatched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use muster_engine::{Transport, TransportError};
use muster_types::{CommandOutput, HostSettings, SettingsList};

/// What the transport does when a given host is executed against.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Succeed immediately with this stdout.
    Instant(String),
    /// Succeed with this stdout after a delay.
    Delayed(Duration, String),
    /// Fail with a transport error.
    Fail(String),
    /// Complete with a nonzero exit code and this stderr.
    ExitCode(i64, String),
    /// Never complete.
    Hang,
}

/// In-memory transport that executes scripted behaviors per host.
pub struct ScriptedTransport {
    behaviors: HashMap<String, Behavior>,
    default: Behavior,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Transport where every host succeeds instantly, echoing its name.
    pub fn new() -> Self {
        Self::with_default(Behavior::Instant(String::new()))
    }

    /// Transport with an explicit default behavior.
    pub fn with_default(default: Behavior) -> Self {
        Self {
            behaviors: HashMap::new(),
            default,
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script a behavior for one host.
    pub fn behave(mut self, host: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(host.to_string(), behavior);
        self
    }

    /// Highest number of executions observed in flight simultaneously.
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    /// Hosts executed against, in dispatch-arrival order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of executions started.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases an in-flight slot when the execution future is dropped, so
/// aborted executions (hangs cancelled by the pool) don't inflate the
/// counter.
struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        settings: &HostSettings,
        _command: &str,
    ) -> Result<CommandOutput, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(settings.host.clone());
        }
        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(active, Ordering::SeqCst);
        let _guard = InFlightGuard {
            counter: &self.in_flight,
        };

        let behavior = self
            .behaviors
            .get(&settings.host)
            .cloned()
            .unwrap_or_else(|| self.default.clone());
        match behavior {
            Behavior::Instant(out) => {
                let out = if out.is_empty() {
                    settings.host.clone()
                } else {
                    out
                };
                Ok(CommandOutput::success(out))
            }
            Behavior::Delayed(delay, out) => {
                tokio::time::sleep(delay).await;
                Ok(CommandOutput::success(out))
            }
            Behavior::Fail(message) => Err(TransportError::Operation(message)),
            Behavior::ExitCode(code, err) => Ok(CommandOutput::failure(code, err)),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

/// Settings list of `n` hosts named `host0..host{n-1}`.
pub fn host_list(n: usize) -> SettingsList {
    (0..n)
        .map(|i| HostSettings::new(format!("host{}", i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_behaviors_play_back() {
        let transport = ScriptedTransport::new()
            .behave("bad", Behavior::Fail("boom".into()))
            .behave("slow", Behavior::Delayed(Duration::from_millis(5), "late".into()));

        let ok = transport
            .execute(&HostSettings::new("fine"), "cmd")
            .await
            .expect("default behavior succeeds");
        assert_eq!(ok.out, "fine");

        let err = transport
            .execute(&HostSettings::new("bad"), "cmd")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));

        let late = transport
            .execute(&HostSettings::new("slow"), "cmd")
            .await
            .expect("delayed behavior succeeds");
        assert_eq!(late.out, "late");

        assert_eq!(transport.calls(), vec!["fine", "bad", "slow"]);
    }

    #[tokio::test]
    async fn cancelled_execution_releases_its_slot() {
        let transport = ScriptedTransport::new().behave("stuck", Behavior::Hang);

        let stuck = HostSettings::new("stuck");
        let hung = transport.execute(&stuck, "cmd");
        let raced = tokio::time::timeout(Duration::from_millis(20), hung).await;
        assert!(raced.is_err(), "hang behavior should outlive the timeout");

        // The cancelled execution must not still count as in flight.
        let ok = transport
            .execute(&HostSettings::new("fine"), "cmd")
            .await
            .expect("default behavior succeeds");
        assert_eq!(ok.out, "fine");
        assert_eq!(transport.high_water_mark(), 1);
    }

    #[test]
    fn host_list_is_ordered() {
        let hosts = host_list(3);
        assert_eq!(hosts.len(), 3);
        assert_eq!(hosts[0].host, "host0");
        assert_eq!(hosts[2].host, "host2");
    }
}
