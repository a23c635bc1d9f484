//! Worker pool engine — bounded-concurrency fan-out/fan-in execution.
//!
//! Runs one [`Operation`] against every record of a settings list with at
//! most `pool_size` executions in flight, collecting results into a
//! [`ResponseList`] aligned with the input order.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        run_pool()                             │
//! │                                                               │
//! │   control channels (one per worker)        shared results     │
//! │  ┌──────────┐ Dispatch(i) | Retire  ┌──────────┐              │
//! │  │ worker 0 │◀───────────────────── │          │              │
//! │  ├──────────┤                       │ orchestr.│──▶ responses │
//! │  │ worker 1 │───(id, idx, resp)────▶│   loop   │    [by idx]  │
//! │  ├──────────┤                       │          │              │
//! │  │   ...    │                       └──────────┘              │
//! │  └──────────┘                                                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Completion order across workers is unconstrained; the result array is
//! populated by index, never by arrival order. Two independent timeouts
//! guard the run: a worker idle timeout (orchestrator went away) and an
//! optional orchestrator-side laggard deadline (workers went away).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use muster_types::{Response, ResponseList, SettingsList};

use crate::error::{EngineError, EngineResult};
use crate::operation::Operation;
use crate::progress::Progress;
use crate::transport::Transport;

/// How many responses must arrive before the laggard deadline is
/// enforced strictly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitFor {
    /// Absolute response count.
    Count(usize),
    /// Fraction of the run's total, rounded up. Must lie in [0.0, 1.0].
    Fraction(f64),
}

impl WaitFor {
    /// Resolve to an absolute count for a run of `total` work units.
    pub fn resolve(&self, total: usize) -> EngineResult<usize> {
        match *self {
            WaitFor::Count(count) => Ok(count.min(total)),
            WaitFor::Fraction(fraction) => {
                if !(0.0..=1.0).contains(&fraction) {
                    return Err(EngineError::InvalidArgument(format!(
                        "wait_for fraction must be within [0.0, 1.0], got {}",
                        fraction
                    )));
                }
                Ok((fraction * total as f64).ceil() as usize)
            }
        }
    }
}

/// Per-run settings for the pool engine.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of concurrently active executions.
    pub pool_size: usize,
    /// Worker-side idle timeout: how long a worker waits for its next
    /// assignment before terminating itself.
    pub child_timeout: Duration,
    /// Per-target failures are warnings (true) or fatal to further
    /// dispatch (false).
    pub warn_only: bool,
    /// Single-line progress reporting.
    pub condensed: bool,
    /// Orchestrator-side deadline for discarding laggards.
    pub laggard_timeout: Option<Duration>,
    /// Threshold before the laggard deadline is strictly enforced.
    pub wait_for: Option<WaitFor>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            child_timeout: Duration::from_secs(60),
            warn_only: true,
            condensed: false,
            laggard_timeout: None,
            wait_for: None,
        }
    }
}

/// Message from the orchestrator to one worker.
enum WorkerMsg {
    /// Execute the work unit at this settings index.
    Dispatch(usize),
    /// Terminate cleanly; no further report expected.
    Retire,
}

/// Report from a worker back to the orchestrator.
struct WorkerReport {
    worker_id: usize,
    index: usize,
    response: Response,
}

/// One live worker: its control handle and the index it currently owns.
struct WorkerSlot {
    control: mpsc::Sender<WorkerMsg>,
    handle: JoinHandle<()>,
    current: usize,
}

/// Execute `operation` against every record of `settings_list`.
///
/// Returns a [`ResponseList`] of the same length, index-aligned with the
/// input. Per-target failures become `Response::Failed` slots; targets
/// whose result never arrived stay at the `Timeout` sentinel. Argument
/// errors are raised before any worker is spawned.
pub async fn run_pool(
    operation: Operation,
    settings_list: SettingsList,
    transport: Arc<dyn Transport>,
    config: &PoolConfig,
) -> EngineResult<ResponseList> {
    let total = settings_list.len();
    if total == 0 {
        return Ok(ResponseList::new(settings_list));
    }

    if let Some(limit) = config.laggard_timeout {
        if limit.is_zero() {
            return Err(EngineError::InvalidArgument(
                "laggard_timeout must be a positive duration".into(),
            ));
        }
    }
    let threshold = match config.wait_for {
        Some(wait_for) => Some(wait_for.resolve(total)?),
        None => None,
    };

    let workers = config.pool_size.max(1).min(total);
    let settings = Arc::new(settings_list);
    let (report_tx, mut report_rx) = mpsc::channel::<WorkerReport>(workers);

    let mut slots: Vec<Option<WorkerSlot>> = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let (control_tx, control_rx) = mpsc::channel::<WorkerMsg>(1);
        let handle = tokio::spawn(worker_loop(
            worker_id,
            control_rx,
            report_tx.clone(),
            operation.clone(),
            Arc::clone(&settings),
            Arc::clone(&transport),
            config.warn_only,
            config.child_timeout,
        ));
        slots.push(Some(WorkerSlot {
            control: control_tx,
            handle,
            current: worker_id,
        }));
    }
    drop(report_tx);

    // All workers start busy: worker i owns index i before any result
    // arrives.
    let mut dead_worker = None;
    for (worker_id, slot) in slots.iter().enumerate() {
        if let Some(slot) = slot {
            if slot.control.send(WorkerMsg::Dispatch(worker_id)).await.is_err() {
                dead_worker = Some(worker_id);
                break;
            }
        }
    }
    if let Some(worker_id) = dead_worker {
        abort_workers(&mut slots);
        return Err(EngineError::Fault(format!(
            "worker {} exited before receiving work",
            worker_id
        )));
    }

    let mut progress = Progress::new(config.condensed, total);
    progress.begin(&operation.label(), config.pool_size);

    let mut responses = vec![Response::Timeout; total];
    let mut dispatched = workers;
    let mut done = 0;
    let mut cumulative_wait = Duration::ZERO;
    let mut laggards_discarded = false;
    let mut halting = false;

    while done < total {
        let wait_started = Instant::now();
        let received = match config.laggard_timeout {
            Some(limit) => time::timeout(limit, report_rx.recv()).await,
            None => Ok(report_rx.recv().await),
        };
        let report = match received {
            Ok(Some(report)) => report,
            Ok(None) => {
                abort_workers(&mut slots);
                return Err(EngineError::Fault(
                    "result channel closed with work outstanding".into(),
                ));
            }
            Err(_) => {
                // Per-wait deadline expired with no response. Keep
                // waiting only while a wait_for threshold exists and has
                // not been met yet.
                match threshold {
                    Some(threshold) if done < threshold => continue,
                    _ => {
                        laggards_discarded = true;
                        break;
                    }
                }
            }
        };
        if config.laggard_timeout.is_some() {
            if let Some(threshold) = threshold {
                if done >= threshold {
                    cumulative_wait += wait_started.elapsed();
                }
            }
        }

        let WorkerReport {
            worker_id,
            index,
            response,
        } = report;
        let failed = response.failed();
        if index < total {
            responses[index] = response;
            done += 1;
            progress.record(done, &settings[index].host_string);
        } else {
            tracing::debug!(worker_id, index, "discarding report for unknown index");
        }

        if !config.warn_only && failed && !halting {
            halting = true;
            tracing::error!(
                host = %settings[index.min(total - 1)].host_string,
                "target failed; halting dispatch of remaining work"
            );
        }

        // Hand the freed worker its next index, or retire it.
        if dispatched < total && !halting {
            let mut sent = false;
            let mut worker_gone = false;
            if let Some(slot) = slots.get_mut(worker_id).and_then(Option::as_mut) {
                slot.current = dispatched;
                if slot.control.send(WorkerMsg::Dispatch(dispatched)).await.is_ok() {
                    sent = true;
                } else {
                    worker_gone = true;
                }
            }
            if worker_gone {
                abort_workers(&mut slots);
                return Err(EngineError::Fault(format!(
                    "worker {} exited while the run was active",
                    worker_id
                )));
            }
            if sent {
                dispatched += 1;
            }
        } else if let Some(slot) = slots.get_mut(worker_id).and_then(|s| s.take()) {
            let _ = slot.control.send(WorkerMsg::Retire).await;
        }

        if let Some(limit) = config.laggard_timeout {
            if threshold.is_some_and(|t| done >= t) && cumulative_wait > limit {
                laggards_discarded = true;
                break;
            }
        }
        if halting && done >= dispatched {
            break;
        }
    }

    // Workers still holding undelivered work are terminated forcibly;
    // their slots keep the Timeout sentinel.
    abort_workers(&mut slots);
    progress.finish(done, laggards_discarded);
    if laggards_discarded {
        tracing::warn!(done, total, "laggards discarded after deadline");
    }

    let settings_list = Arc::try_unwrap(settings).unwrap_or_else(|shared| (*shared).clone());
    Ok(ResponseList::from_parts(settings_list, responses)?)
}

/// One long-lived worker: wait for an index, execute, report, repeat.
#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    worker_id: usize,
    mut control: mpsc::Receiver<WorkerMsg>,
    report: mpsc::Sender<WorkerReport>,
    operation: Operation,
    settings: Arc<SettingsList>,
    transport: Arc<dyn Transport>,
    warn_only: bool,
    idle_timeout: Duration,
) {
    loop {
        let msg = match time::timeout(idle_timeout, control.recv()).await {
            Ok(Some(msg)) => msg,
            // Orchestrator gone or idle too long: don't linger.
            Ok(None) => return,
            Err(_) => {
                tracing::debug!(worker_id, "idle timeout; worker terminating");
                return;
            }
        };
        let index = match msg {
            WorkerMsg::Dispatch(index) => index,
            WorkerMsg::Retire => return,
        };
        let response = match settings.get(index) {
            Some(target) => match operation.apply(target, transport.as_ref()).await {
                Ok(output) => Response::Completed(output),
                Err(err) => {
                    if warn_only {
                        tracing::warn!(host = %target.host_string, error = %err, "operation failed");
                    } else {
                        tracing::error!(host = %target.host_string, error = %err, "operation failed");
                    }
                    Response::Failed(err.to_string())
                }
            },
            None => Response::Failed(format!("no settings at index {}", index)),
        };
        let delivered = report.send(WorkerReport {
            worker_id,
            index,
            response,
        });
        if delivered.await.is_err() {
            return;
        }
    }
}

fn abort_workers(slots: &mut [Option<WorkerSlot>]) {
    for slot in slots.iter_mut() {
        if let Some(slot) = slot.take() {
            tracing::debug!(index = slot.current, "terminating worker holding work");
            slot.handle.abort();
        }
    }
}
