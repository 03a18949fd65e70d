// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Trailing-edge debounce with a single in-flight run.
//!
//! A burst of triggers collapses into one run that starts `delay` after the
//! last trigger. At most one run is in flight at a time. Triggers arriving
//! while a run is in flight are folded into a single rerun, started as soon
//! as the current run finishes.
//!
//! [`DebounceState`] is the pure state machine. [`DebouncedScheduler`] drives
//! it on a tokio task and hands out [`Trigger`]s, which are plain synchronous
//! handles safe to call from a watcher thread.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Instant};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebounceState {
    /// Nothing pending.
    #[default]
    Idle,
    /// A run starts at `deadline` unless another trigger pushes it back.
    Scheduled {
        /// When the timer fires.
        deadline: Instant,
    },
    /// A run is in flight.
    Running,
    /// A run is in flight and another one must follow it.
    RunningWithRerun,
}

impl DebounceState {
    /// Records a trigger at `now`.
    pub fn trigger(&mut self, now: Instant, delay: Duration) {
        *self = match *self {
            Self::Idle | Self::Scheduled { .. } => Self::Scheduled {
                deadline: now + delay,
            },
            Self::Running | Self::RunningWithRerun => Self::RunningWithRerun,
        };
    }

    /// Requests a run without debouncing. Returns true when a run must start.
    ///
    /// While a run is in flight the request becomes the pending rerun.
    pub fn run_now(&mut self) -> bool {
        match *self {
            Self::Idle | Self::Scheduled { .. } => {
                *self = Self::Running;
                true
            }
            Self::Running | Self::RunningWithRerun => {
                *self = Self::RunningWithRerun;
                false
            }
        }
    }

    /// The debounce timer fired. Returns true when a run must start.
    pub fn timer_elapsed(&mut self) -> bool {
        match *self {
            Self::Scheduled { .. } => {
                *self = Self::Running;
                true
            }
            _ => false,
        }
    }

    /// The in-flight run finished. Returns true when a rerun must start now.
    pub fn run_finished(&mut self) -> bool {
        match *self {
            Self::RunningWithRerun => {
                *self = Self::Running;
                true
            }
            Self::Running => {
                *self = Self::Idle;
                false
            }
            _ => false,
        }
    }

    /// Drops any pending work, keeping only the in-flight run.
    pub fn cancel_pending(&mut self) {
        *self = match *self {
            Self::Running | Self::RunningWithRerun => Self::Running,
            _ => Self::Idle,
        };
    }

    /// Deadline of the pending timer, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match *self {
            Self::Scheduled { deadline } => Some(deadline),
            _ => None,
        }
    }
}

enum Message {
    Trigger,
    RunNow,
    Shutdown,
}

/// Cheap, cloneable handle that requests a debounced run.
#[derive(Debug, Clone)]
pub struct Trigger {
    tx: mpsc::UnboundedSender<Message>,
}

impl Trigger {
    /// Requests a run. Never blocks; a no-op after shutdown.
    pub fn trigger(&self) {
        let _ = self.tx.send(Message::Trigger);
    }

    /// Requests a run that skips the debounce delay.
    ///
    /// Still never overlaps an in-flight run.
    pub fn run_now(&self) {
        let _ = self.tx.send(Message::RunNow);
    }
}

/// A running debounce driver.
pub struct DebouncedScheduler {
    tx: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
}

impl DebouncedScheduler {
    /// Returns a handle that requests runs.
    pub fn trigger(&self) -> Trigger {
        Trigger {
            tx: self.tx.clone(),
        }
    }

    /// Stops the driver.
    ///
    /// A pending timer or rerun is discarded. A run already in flight is
    /// awaited.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Message::Shutdown);
        if let Err(e) = self.task.await {
            tracing::error!("Debounce driver failed: {}", e);
        }
    }
}

/// Spawns a debounce driver around `run_once`.
///
/// Must be called from within a tokio runtime.
pub fn make_trigger<F, Fut>(run_once: F, delay: Duration) -> DebouncedScheduler
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(drive(rx, run_once, delay));
    DebouncedScheduler { tx, task }
}

async fn wait_for(run: &mut Option<JoinHandle<()>>) -> Result<(), JoinError> {
    match run {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn drive<F, Fut>(mut rx: mpsc::UnboundedReceiver<Message>, run_once: F, delay: Duration)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut state = DebounceState::Idle;
    let mut running: Option<JoinHandle<()>> = None;
    let mut closing = false;

    loop {
        if closing && running.is_none() {
            break;
        }
        let deadline = state.deadline();

        tokio::select! {
            msg = rx.recv(), if !closing => match msg {
                Some(Message::Trigger) => state.trigger(Instant::now(), delay),
                Some(Message::RunNow) => {
                    if state.run_now() {
                        running = Some(tokio::spawn(run_once()));
                    }
                }
                Some(Message::Shutdown) | None => {
                    closing = true;
                    state.cancel_pending();
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if state.timer_elapsed() {
                    running = Some(tokio::spawn(run_once()));
                }
            },
            result = wait_for(&mut running), if running.is_some() => {
                running = None;
                if let Err(e) = result {
                    tracing::error!("Debounced run failed: {}", e);
                }
                if closing {
                    state.cancel_pending();
                }
                if state.run_finished() {
                    running = Some(tokio::spawn(run_once()));
                }
            },
        }
    }
}
