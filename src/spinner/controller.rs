//! Server context that owns the spin flag and the tasks driven by it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::policy::SpinPolicy;
use super::state::SpinFlag;
use crate::config::Config;
use crate::error::SpinError;
use crate::metrics;

/// Snapshot of the controller, served by `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpinStatus {
    /// Current value of the spin flag.
    pub spinning: bool,
    /// Spin loops that have not exited yet.
    pub active_loops: u64,
    /// Auto-stop timers that have neither fired nor been cancelled.
    pub active_timers: u64,
    /// Spin requests accepted since start.
    pub spins_started: u64,
    /// Policy applied to new spin requests.
    pub policy: SpinPolicy,
}

/// Owns the spin flag, the cancellation tokens and task bookkeeping.
///
/// Cheap to clone; clones share everything.
#[derive(Debug, Clone)]
pub struct SpinController {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    flag: SpinFlag,
    policy: SpinPolicy,
    poll_interval: Duration,
    max_spin_time: Duration,
    /// Cancelled on shutdown. Every generation is a child of it.
    root: CancellationToken,
    /// Token shared by the loops and timers of the current generation.
    generation: Mutex<CancellationToken>,
    active_loops: AtomicU64,
    active_timers: AtomicU64,
    spins_started: AtomicU64,
}

impl SpinController {
    /// Create a controller from the application config.
    pub fn new(config: &Config) -> Self {
        Self::with_settings(
            config.spin_policy,
            config.poll_interval(),
            config.max_spin_time(),
        )
    }

    /// Create a controller with explicit settings.
    pub fn with_settings(
        policy: SpinPolicy,
        poll_interval: Duration,
        max_spin_time: Duration,
    ) -> Self {
        let root = CancellationToken::new();
        let generation = root.child_token();

        Self {
            inner: Arc::new(Inner {
                flag: SpinFlag::new(),
                policy,
                poll_interval,
                max_spin_time,
                root,
                generation: Mutex::new(generation),
                active_loops: AtomicU64::new(0),
                active_timers: AtomicU64::new(0),
                spins_started: AtomicU64::new(0),
            }),
        }
    }

    /// Whether the spin flag is set.
    pub fn is_spinning(&self) -> bool {
        self.inner.flag.is_spinning()
    }

    /// Largest duration [`spin`](Self::spin) accepts.
    pub fn max_spin_time(&self) -> Duration {
        self.inner.max_spin_time
    }

    /// Set the flag, start a spin loop and arm an auto-stop timer.
    ///
    /// Returns the sequence number of this spin. Must be called from within
    /// a tokio runtime; the timer runs on it.
    #[instrument(skip(self), fields(spin_time_ms = spin_time.as_millis() as u64))]
    pub fn spin(&self, spin_time: Duration) -> Result<u64, SpinError> {
        if spin_time > self.inner.max_spin_time {
            return Err(SpinError::InvalidParameter {
                name: "spin_time",
                reason: format!(
                    "must be at most {}s",
                    self.inner.max_spin_time.as_secs_f64()
                ),
            });
        }

        if self.inner.root.is_cancelled() {
            return Err(SpinError::Internal("server is shutting down".to_string()));
        }

        let runtime = Handle::try_current()
            .map_err(|e| SpinError::Internal(format!("no runtime for auto-stop timer: {}", e)))?;

        let cancel = self.next_generation();
        let id = self.inner.spins_started.fetch_add(1, Ordering::SeqCst) + 1;

        self.inner.flag.set(true);

        let loop_guard = ActiveGuard::new(self.inner.clone(), TaskKind::Loop);
        let flag = self.inner.flag.clone();
        let loop_cancel = cancel.clone();
        let poll_interval = self.inner.poll_interval;

        let spawned = thread::Builder::new()
            .name(format!("spin-loop-{}", id))
            .spawn(move || run_spin_loop(id, flag, loop_cancel, poll_interval, loop_guard));

        if let Err(e) = spawned {
            self.inner.flag.set(false);
            return Err(SpinError::Internal(format!(
                "failed to start spin loop: {}",
                e
            )));
        }

        let timer_guard = ActiveGuard::new(self.inner.clone(), TaskKind::Timer);
        runtime.spawn(run_auto_stop_timer(
            id,
            self.inner.flag.clone(),
            cancel,
            spin_time,
            timer_guard,
        ));

        metrics::inc_spins_started();
        info!(spin = id, policy = %self.inner.policy, "Spinning");

        Ok(id)
    }

    /// Clear the flag. Returns whether it was set.
    ///
    /// Running loops exit on their next poll. Timers are left armed.
    pub fn unspin(&self) -> bool {
        let was_spinning = self.inner.flag.set(false);
        metrics::inc_unspins();
        if was_spinning {
            info!("Unspun");
        } else {
            debug!("Unspin with no active spin");
        }
        was_spinning
    }

    /// Current flag value and task counts.
    pub fn status(&self) -> SpinStatus {
        SpinStatus {
            spinning: self.inner.flag.is_spinning(),
            active_loops: self.inner.active_loops.load(Ordering::SeqCst),
            active_timers: self.inner.active_timers.load(Ordering::SeqCst),
            spins_started: self.inner.spins_started.load(Ordering::SeqCst),
            policy: self.inner.policy,
        }
    }

    /// Clear the flag and cancel every loop and timer.
    ///
    /// Later spin requests are rejected.
    pub fn shutdown(&self) {
        self.inner.flag.set(false);
        self.inner.root.cancel();
        info!("Spin controller shut down");
    }

    /// Token for the tasks of a new spin, honouring the policy.
    fn next_generation(&self) -> CancellationToken {
        let mut generation = self
            .inner
            .generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.inner.policy == SpinPolicy::Replace {
            generation.cancel();
            *generation = self.inner.root.child_token();
        }

        generation.clone()
    }
}

fn run_spin_loop(
    id: u64,
    flag: SpinFlag,
    cancel: CancellationToken,
    poll_interval: Duration,
    _guard: ActiveGuard,
) {
    let started = Instant::now();

    while flag.is_spinning() && !cancel.is_cancelled() {
        thread::sleep(poll_interval);
    }

    metrics::record_spin_loop_duration(started);
    debug!(
        spin = id,
        cancelled = cancel.is_cancelled(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Spin loop exited"
    );
}

async fn run_auto_stop_timer(
    id: u64,
    flag: SpinFlag,
    cancel: CancellationToken,
    spin_time: Duration,
    _guard: ActiveGuard,
) {
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!(spin = id, "Auto-stop timer cancelled");
        }
        _ = tokio::time::sleep(spin_time) => {
            if flag.set(false) {
                info!(spin = id, "Auto-stop timer fired");
            } else {
                debug!(spin = id, "Auto-stop timer fired with flag already clear");
            }
            metrics::inc_timer_expirations();
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TaskKind {
    Loop,
    Timer,
}

/// Counts a background task as active for as long as it is alive.
#[derive(Debug)]
struct ActiveGuard {
    inner: Arc<Inner>,
    kind: TaskKind,
}

impl ActiveGuard {
    fn new(inner: Arc<Inner>, kind: TaskKind) -> Self {
        let count = inner.counter(kind).fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_tasks(kind.gauge(), count);
        Self { inner, kind }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let previous = self.inner.counter(self.kind).fetch_sub(1, Ordering::SeqCst);
        if previous == 0 {
            warn!(kind = ?self.kind, "Active task counter underflow");
            return;
        }
        metrics::set_active_tasks(self.kind.gauge(), previous - 1);
    }
}

impl Inner {
    fn counter(&self, kind: TaskKind) -> &AtomicU64 {
        match kind {
            TaskKind::Loop => &self.active_loops,
            TaskKind::Timer => &self.active_timers,
        }
    }
}

impl TaskKind {
    fn gauge(self) -> &'static str {
        match self {
            TaskKind::Loop => metrics::METRIC_SPIN_LOOPS_ACTIVE,
            TaskKind::Timer => metrics::METRIC_SPIN_TIMERS_ACTIVE,
        }
    }
}
