//! Drives the simulated progress timeline on the tokio timer.
//!
//! A run owns one [`ProgressSimulator`] and one background task. Snapshots go
//! out on a `watch` channel that outlives individual runs, so a renderer can
//! subscribe once. Forcing completion cancels the task; nothing keeps
//! ticking after a run is finished.

use contable_core::ProgressSimulator;
use contable_core::progress::ProgressState;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Publishes progress snapshots and starts timeline runs.
#[derive(Clone)]
pub struct ProgressRunner {
    sender: watch::Sender<ProgressState>,
}

impl ProgressRunner {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ProgressState::initial());
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.sender.subscribe()
    }

    /// Current snapshot.
    pub fn current(&self) -> ProgressState {
        *self.sender.borrow()
    }

    /// Resets to 0% / analyzing, makes the indicator visible and starts
    /// the timers. Must be called from within a tokio runtime.
    pub fn start(&self) -> ProgressRun {
        let simulator = Arc::new(Mutex::new(ProgressSimulator::new()));
        let cancel = CancellationToken::new();

        if let Ok(sim) = simulator.lock() {
            self.sender.send_replace(sim.snapshot());
        }

        let task = tokio::spawn(drive(
            simulator.clone(),
            self.sender.clone(),
            cancel.clone(),
        ));

        ProgressRun {
            simulator,
            sender: self.sender.clone(),
            cancel,
            task,
        }
    }

    /// Hides the indicator and resets it to its initial values.
    pub fn hide(&self) {
        self.sender.send_replace(ProgressState::initial());
    }
}

impl Default for ProgressRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one in-progress timeline.
pub struct ProgressRun {
    simulator: Arc<Mutex<ProgressSimulator>>,
    sender: watch::Sender<ProgressState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ProgressRun {
    /// Forces 100% / finalizing and stops the timers.
    pub fn complete(&self) {
        self.cancel.cancel();
        if let Ok(mut sim) = self.simulator.lock() {
            sim.force_complete();
            self.sender.send_replace(sim.snapshot());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ProgressRun {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn drive(
    simulator: Arc<Mutex<ProgressSimulator>>,
    sender: watch::Sender<ProgressState>,
    cancel: CancellationToken,
) {
    loop {
        let delay = match simulator.lock() {
            Ok(sim) => sim.next_delay(),
            Err(_) => None,
        };
        let Some(delay) = delay else {
            break;
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        // complete() may have won the race while we slept
        let Ok(mut sim) = simulator.lock() else {
            break;
        };
        if cancel.is_cancelled() || sim.is_finished() {
            break;
        }
        sim.advance();
        sender.send_replace(sim.snapshot());
    }
    tracing::trace!("progress timeline stopped");
}
