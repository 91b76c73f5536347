//! Execution bridge: run async work from blocking code.
//!
//! # How it works
//!
//! ```text
//! caller thread                     worker thread ("pikvm-bridge")
//! ─────────────                     ──────────────────────────────
//! submit(unit) ──Command::Run──►    current-thread runtime
//!     │                               └─ JoinSet::spawn(unit(state))
//!     │                                      │
//!     ◄──────────── oneshot reply ───────────┘
//! blocking_recv()
//! ```
//!
//! The worker owns its runtime and the shared state `S` (for the blocking
//! client, an [`AsyncKvmClient`](crate::AsyncKvmClient)).  Units from several
//! caller threads run concurrently on that one runtime, interleaving at
//! await points, which is what lets a long drag on one thread overlap with a
//! screenshot on another.
//!
//! # Shutdown
//!
//! [`shutdown`](ExecutionBridge::shutdown) is cooperative: the worker stops
//! accepting units, lets the ones already running finish, and exits.  The
//! caller waits at most the given timeout; if the worker has not exited by
//! then it is detached and [`ShutdownOutcome::TimedOut`] is returned.

use std::future::Future;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use futures_util::future::BoxFuture;
use pikvm_core::{KvmError, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// How long [`ExecutionBridge::shutdown`] waits by default.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Stopped,
    Running,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The worker exited and was joined.
    Joined,
    /// The worker did not exit within the timeout and was detached.
    TimedOut,
    /// The bridge was already stopped.
    AlreadyStopped,
}

type Job<S> = Box<dyn FnOnce(Arc<S>) -> BoxFuture<'static, ()> + Send>;

enum Command<S> {
    Run(Job<S>),
    Stop,
}

struct Worker {
    thread: thread::JoinHandle<()>,
    /// Disconnects when the worker thread exits.
    exited: std_mpsc::Receiver<()>,
}

/// A worker thread with its own event loop, owning an `S`.
pub struct ExecutionBridge<S: Send + Sync + 'static> {
    state: Mutex<BridgeState>,
    commands: Mutex<Option<mpsc::UnboundedSender<Command<S>>>>,
    worker: Mutex<Option<Worker>>,
}

impl<S: Send + Sync + 'static> ExecutionBridge<S> {
    /// Spawns the worker thread and builds `S` on it with `init`.
    ///
    /// `init` runs inside the worker's runtime, so it may spawn tasks or
    /// create runtime-bound resources.
    ///
    /// # Errors
    ///
    /// Whatever `init` returns, or [`KvmError::Transport`] if the thread or
    /// runtime cannot be created.
    pub fn start<F>(name: &str, init: F) -> Result<Self>
    where
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<()>>(1);
        let (exited_tx, exited_rx) = std_mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _exited = exited_tx;
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(KvmError::transport("build bridge runtime", e)));
                        return;
                    }
                };

                let state = {
                    let _guard = runtime.enter();
                    match init() {
                        Ok(state) => Arc::new(state),
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    }
                };
                let _ = ready_tx.send(Ok(()));

                runtime.block_on(run_worker(state, command_rx));
                debug!("bridge worker exited");
            })
            .map_err(|e| KvmError::transport("spawn bridge worker", e))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(KvmError::BridgeStopped);
            }
        }

        info!(name, "execution bridge started");
        Ok(Self {
            state: Mutex::new(BridgeState::Running),
            commands: Mutex::new(Some(command_tx)),
            worker: Mutex::new(Some(Worker {
                thread,
                exited: exited_rx,
            })),
        })
    }

    pub fn state(&self) -> BridgeState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.state() == BridgeState::Running
    }

    /// Runs `unit` on the worker and blocks until it completes, returning its
    /// result on this thread.
    ///
    /// # Panics
    ///
    /// If called from inside an async runtime (including from a unit running
    /// on this bridge).
    ///
    /// # Errors
    ///
    /// [`KvmError::BridgeStopped`] if the bridge is not running or the unit
    /// was dropped before completing; otherwise whatever `unit` returns.
    pub fn submit<T, F, Fut>(&self, unit: F) -> Result<T>
    where
        F: FnOnce(Arc<S>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job<S> = Box::new(move |state| {
            Box::pin(async move {
                let _ = reply_tx.send(unit(state).await);
            })
        });

        {
            let commands = lock(&self.commands);
            let sender = commands.as_ref().ok_or(KvmError::BridgeStopped)?;
            sender
                .send(Command::Run(job))
                .map_err(|_| KvmError::BridgeStopped)?;
        }

        reply_rx.blocking_recv().map_err(|_| KvmError::BridgeStopped)?
    }

    /// Stops the worker, waiting up to `timeout` for units in flight.
    pub fn shutdown(&self, timeout: Duration) -> ShutdownOutcome {
        let Some(sender) = lock(&self.commands).take() else {
            return ShutdownOutcome::AlreadyStopped;
        };
        *lock(&self.state) = BridgeState::Stopping;

        let _ = sender.send(Command::Stop);
        drop(sender);

        let outcome = match lock(&self.worker).take() {
            Some(worker) => match worker.exited.recv_timeout(timeout) {
                Err(std_mpsc::RecvTimeoutError::Timeout) => {
                    warn!(?timeout, "bridge worker did not stop in time; detaching it");
                    ShutdownOutcome::TimedOut
                }
                Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                    if worker.thread.join().is_err() {
                        error!("bridge worker panicked");
                    }
                    ShutdownOutcome::Joined
                }
            },
            None => ShutdownOutcome::Joined,
        };

        *lock(&self.state) = BridgeState::Stopped;
        info!(?outcome, "execution bridge stopped");
        outcome
    }
}

impl<S: Send + Sync + 'static> Drop for ExecutionBridge<S> {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_JOIN_TIMEOUT);
    }
}

async fn run_worker<S: Send + Sync + 'static>(
    state: Arc<S>,
    mut commands: mpsc::UnboundedReceiver<Command<S>>,
) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Run(job)) => {
                    in_flight.spawn(job(Arc::clone(&state)));
                }
                Some(Command::Stop) | None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "bridge unit panicked");
                }
            }
        }
    }

    let pending = in_flight.len();
    if pending > 0 {
        debug!(pending, "waiting for in-flight units");
    }
    while in_flight.join_next().await.is_some() {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
