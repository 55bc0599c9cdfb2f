/// Periodic tick source for the reconciliation loop.
///
/// The ticker only emits [`DaemonEvent::Tick`]; the event loop owns the
/// reconciler and runs the tick itself, so ticks never overlap with
/// track/untrack handling.  Stopping is explicit and awaited, so shutdown
/// does not depend on process exit.
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::event::DaemonEvent;

/// A running ticker task.
pub struct Ticker {
    /// Setting this to `true` signals the task to stop.
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Starts emitting a tick every `period` into `tx`.  The first tick fires
    /// immediately.
    pub fn start(period: Duration, tx: mpsc::Sender<DaemonEvent>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(period, tx, stop_rx));
        Ticker { stop_tx, handle }
    }

    /// Signals the task to stop and waits for it to finish.  No tick is sent
    /// after this returns.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.handle.await;
    }
}

async fn run(period: Duration, tx: mpsc::Sender<DaemonEvent>, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = interval(period);
    // A slow tick should not cause a burst of catch-up ticks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if *stop_rx.borrow() {
                    break;
                }
                match tx.try_send(DaemonEvent::Tick) {
                    Ok(()) => {}
                    // The loop is still busy; the next tick re-asserts state anyway.
                    Err(mpsc::error::TrySendError::Full(_)) => {}
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
}
