//! Run control: one background worker per run, events delivered over a channel.
//!
//! [`CombineController`] owns the consumer side. The worker thread owns every table for the
//! duration of the run; the only shared state is the [`CancellationToken`], the run state and
//! the event channel.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use sheet_stacker::config::RunConfig;
//! use sheet_stacker::execution::{CombineController, RunEvent};
//!
//! # fn main() -> Result<(), sheet_stacker::CombineError> {
//! let config = RunConfig::new("inputs", "inputs/combined.xlsx").with_sheet_name("Plan1");
//! let mut controller = CombineController::new();
//! controller.start(config)?;
//!
//! while let Some(event) = controller.recv_timeout(Duration::from_secs(60)) {
//!     match event {
//!         RunEvent::Progress(p) => println!("{:>3}% {}", p.percent, p.status),
//!         RunEvent::Log(entry) => println!("{entry}"),
//!         RunEvent::Finished(outcome) => {
//!             println!("{outcome}");
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod cancel;
mod metrics;
mod observer;
mod pipeline;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::RunConfig;
use crate::error::{CombineError, CombineResult};

pub use cancel::CancellationToken;
pub use metrics::{RunMetrics, RunMetricsSnapshot};
pub use observer::{
    percent_of, ChannelObserver, CompositeObserver, FileObserver, LogEntry, ProgressEvent, RunEvent,
    RunObserver, RunOutcome, RunState, StdErrObserver,
};
pub use pipeline::run_combine;

const WORKER_THREAD_NAME: &str = "sheet-stacker-worker";

/// Starts, cancels and observes combine runs. At most one run is active at a time.
pub struct CombineController {
    observer: Option<Arc<dyn RunObserver>>,
    metrics: Arc<RunMetrics>,
    state: Arc<Mutex<RunState>>,
    cancel: Option<CancellationToken>,
    events: Option<mpsc::Receiver<RunEvent>>,
    handle: Option<JoinHandle<RunOutcome>>,
}

impl CombineController {
    pub fn new() -> Self {
        Self {
            observer: None,
            metrics: Arc::new(RunMetrics::new()),
            state: Arc::new(Mutex::new(RunState::Idle)),
            cancel: None,
            events: None,
            handle: None,
        }
    }

    /// Attach an observer that receives every event in addition to the channel.
    ///
    /// It runs on the worker thread.
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Handle to the live counters of the current (or last) run.
    pub fn metrics(&self) -> Arc<RunMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Validate `config` and start a run on a background thread.
    ///
    /// Fails with [`CombineError::RunInProgress`] while a run is active and with
    /// [`CombineError::InvalidConfig`] before spawning anything if `config` is unusable.
    /// Events from the previous run that were not polled are discarded.
    pub fn start(&mut self, config: RunConfig) -> CombineResult<()> {
        if self.is_running() {
            return Err(CombineError::RunInProgress);
        }
        config.validate()?;

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        let (channel, rx) = ChannelObserver::channel();
        let mut observers: Vec<Arc<dyn RunObserver>> = vec![
            Arc::new(StateObserver {
                state: Arc::clone(&self.state),
            }),
            Arc::new(channel),
        ];
        if let Some(extra) = &self.observer {
            observers.push(Arc::clone(extra));
        }
        let observer = CompositeObserver::new(observers);

        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let metrics = Arc::clone(&self.metrics);

        self.set_state(RunState::Running);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_combine(&config, &worker_cancel, &observer, &metrics)
                }));
                match result {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::error!("combine worker panicked; reporting run as failed");
                        let outcome = RunOutcome::Error {
                            message: "internal error: combine worker panicked".to_string(),
                        };
                        observer.on_event(&RunEvent::Progress(ProgressEvent {
                            percent: 100,
                            status: outcome.to_string(),
                        }));
                        observer.on_event(&RunEvent::Finished(outcome.clone()));
                        outcome
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                tracing::info!("combine run started");
                self.handle = Some(handle);
                self.cancel = Some(cancel);
                self.events = Some(rx);
                Ok(())
            }
            Err(e) => {
                self.set_state(RunState::Idle);
                Err(CombineError::Io(e))
            }
        }
    }

    /// Ask the active run to stop at the next file boundary. No-op when idle.
    pub fn cancel(&self) {
        if !self.is_running() {
            return;
        }
        if let Some(token) = &self.cancel {
            tracing::info!("combine run cancellation requested");
            token.cancel();
        }
    }

    /// Token of the active run, for cancelling from another thread. `None` when idle.
    pub fn cancel_token(&self) -> Option<CancellationToken> {
        if !self.is_running() {
            return None;
        }
        self.cancel.clone()
    }

    /// Drain at most `max` pending events without blocking, in production order.
    pub fn poll_events(&self, max: usize) -> Vec<RunEvent> {
        let mut out = Vec::with_capacity(max.min(64));
        if let Some(rx) = &self.events {
            while out.len() < max {
                match rx.try_recv() {
                    Ok(event) => out.push(event),
                    Err(_) => break,
                }
            }
        }
        out
    }

    /// Block up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout, or once the run has finished and every event was received.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RunEvent> {
        self.events.as_ref()?.recv_timeout(timeout).ok()
    }

    /// Block until the current run ends and return its outcome.
    ///
    /// Returns `None` if no run was started since the last `wait`. Undelivered events stay
    /// available to [`Self::poll_events`].
    pub fn wait(&mut self) -> Option<RunOutcome> {
        let handle = self.handle.take()?;
        let outcome = handle.join().unwrap_or_else(|_| RunOutcome::Error {
            message: "internal error: combine worker could not be joined".to_string(),
        });
        if self.is_running() {
            self.set_state(outcome.state());
        }
        Some(outcome)
    }

    fn set_state(&self, state: RunState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

impl Default for CombineController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CombineController {
    fn drop(&mut self) {
        if let Some(token) = &self.cancel {
            token.cancel();
        }
    }
}

/// Moves the controller to the terminal state before the `Finished` event reaches the consumer.
struct StateObserver {
    state: Arc<Mutex<RunState>>,
}

impl RunObserver for StateObserver {
    fn on_event(&self, event: &RunEvent) {
        if let RunEvent::Finished(outcome) = event {
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = outcome.state();
        }
    }
}
