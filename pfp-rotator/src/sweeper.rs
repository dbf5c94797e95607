//! Background removal of expired rate records
//!
//! The sweep only bounds memory: admission decisions replace expired
//! records on their own, so a stopped or slow sweeper never changes an
//! outcome.

use pfp_governor::{Clock, RateGovernor, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A running sweep loop
///
/// Dropping the task also ends the loop; call
/// [`stop`](SweepTask::stop) to wait for it.
pub struct SweepTask {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl SweepTask {
    /// Start sweeping `governor` every `interval`
    ///
    /// The first sweep runs one full interval after start.
    pub fn spawn<S, C>(governor: Arc<RateGovernor<S, C>>, interval: Duration) -> Self
    where
        S: Store + 'static,
        C: Clock + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!("Sweep task started (interval: {:?})", interval);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let removed = governor.sweep();
                        tracing::debug!(
                            removed,
                            tracked = governor.len(),
                            "Swept expired rate records"
                        );
                    }
                }
            }

            tracing::info!("Sweep task stopped");
        });

        SweepTask {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the loop and wait for it to finish
    pub async fn stop(self) {
        let SweepTask {
            shutdown_tx,
            handle,
        } = self;

        // The loop may already be gone if it panicked
        let _ = shutdown_tx.send(());
        if let Err(e) = handle.await {
            tracing::error!("Sweep task panicked: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
