//! Non-overlapping, coalescing rebuilds.
//!
//! [`RebuildGate`] is the whole concurrency story: a two-state machine
//! (`Idle`, `Rebuilding`) plus one pending flag, all behind a single mutex.
//! A trigger while `Idle` starts a run; a trigger while `Rebuilding` only
//! sets the flag. When a pass returns, a set flag is cleared and exactly one
//! more pass runs, so any number of triggers during one pass collapse into
//! a single follow-up.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use snowcat_blueprint::ParseError;
use snowcat_telemetry::{log_rebuild_completed, log_rebuild_failed, log_rebuild_started};

use crate::render::RenderError;

/// Errors from one rebuild pass. None of them stop the watch loop.
#[derive(Debug, Error)]
pub enum RebuildError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rebuild task failed: {0}")]
    Task(String),
}

/// Result of one rebuild pass: an optional operator notice on success.
pub type RebuildOutcome = Result<Option<String>, RebuildError>;

/// The work performed on every rebuild pass.
///
/// Runs on the blocking thread pool.
pub trait RebuildAction: Send + Sync + 'static {
    fn rebuild(&self) -> RebuildOutcome;
}

impl<F> RebuildAction for F
where
    F: Fn() -> RebuildOutcome + Send + Sync + 'static,
{
    fn rebuild(&self) -> RebuildOutcome {
        self()
    }
}

/// Receives the outcome of every rebuild pass.
pub trait RebuildSink: Send + Sync + 'static {
    fn report(&self, outcome: &RebuildOutcome);
}

/// Prints notices and errors to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl RebuildSink for ConsoleSink {
    fn report(&self, outcome: &RebuildOutcome) {
        match outcome {
            Ok(Some(notice)) if !self.quiet => println!("{notice}"),
            Ok(_) => {}
            Err(e) => println!("{e}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildState {
    Idle,
    Rebuilding,
}

#[derive(Debug)]
struct GateInner {
    state: RebuildState,
    pending: bool,
}

/// Idle/Rebuilding state machine with a single pending flag.
#[derive(Debug)]
pub struct RebuildGate {
    inner: Mutex<GateInner>,
}

impl Default for RebuildGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RebuildGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: RebuildState::Idle,
                pending: false,
            }),
        }
    }

    /// Record a rebuild request.
    ///
    /// Returns `true` when the caller moved the gate from `Idle` to
    /// `Rebuilding` and must start a run.
    pub fn request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            RebuildState::Idle => {
                inner.state = RebuildState::Rebuilding;
                true
            }
            RebuildState::Rebuilding => {
                inner.pending = true;
                false
            }
        }
    }

    /// Record the end of a pass.
    ///
    /// Returns `true` when a request arrived during the pass; the gate stays
    /// `Rebuilding` and the caller must run one more pass. Otherwise the gate
    /// returns to `Idle`.
    pub fn finish(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.pending {
            inner.pending = false;
            true
        } else {
            inner.state = RebuildState::Idle;
            false
        }
    }

    /// Drop a pending request that arrived before the current pass started
    /// reading its inputs. The pass about to run covers it.
    pub fn absorb_pending(&self) {
        self.inner.lock().pending = false;
    }

    pub fn state(&self) -> RebuildState {
        self.inner.lock().state
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending
    }
}

/// Drives a [`RebuildAction`] through a [`RebuildGate`].
///
/// With an interval configured, a pass never starts before `interval` has
/// elapsed since the request that caused it. Requests arriving during that
/// wait are folded into the pass instead of scheduling another one.
#[derive(Clone)]
pub struct RebuildCoordinator {
    gate: Arc<RebuildGate>,
    action: Arc<dyn RebuildAction>,
    sink: Arc<dyn RebuildSink>,
    interval: Option<Duration>,
}

impl RebuildCoordinator {
    pub fn new(action: Arc<dyn RebuildAction>, sink: Arc<dyn RebuildSink>) -> Self {
        Self {
            gate: Arc::new(RebuildGate::new()),
            action,
            sink,
            interval: None,
        }
    }

    /// Pace rebuilds to a fixed interval.
    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval;
        self
    }

    pub fn gate(&self) -> &RebuildGate {
        &self.gate
    }

    /// Request a rebuild.
    ///
    /// Returns the handle of the run this call started, or `None` when a run
    /// is already in flight (the request is then coalesced into it).
    pub fn trigger(&self) -> Option<JoinHandle<()>> {
        if !self.gate.request() {
            tracing::debug!("rebuild in flight, coalescing request");
            return None;
        }
        let this = self.clone();
        Some(tokio::spawn(this.run(Instant::now())))
    }

    async fn run(self, mut requested_at: Instant) {
        loop {
            if let Some(interval) = self.interval {
                tokio::time::sleep_until(requested_at + interval).await;
                self.gate.absorb_pending();
            }

            log_rebuild_started!("rebuild started");
            let action = Arc::clone(&self.action);
            let outcome = tokio::task::spawn_blocking(move || action.rebuild())
                .await
                .unwrap_or_else(|e| Err(RebuildError::Task(e.to_string())));

            match &outcome {
                Ok(_) => log_rebuild_completed!("rebuild completed"),
                Err(e) => log_rebuild_failed!(error = %e, "rebuild failed"),
            }
            self.sink.report(&outcome);

            if !self.gate.finish() {
                break;
            }
            // The coalesced request arrived no later than now.
            requested_at = Instant::now();
        }
    }
}
