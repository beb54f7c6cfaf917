//! Background eviction of expired cache entries.

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;

/// Handle to a running sweeper task.
///
/// The sweeper stops when [`SweeperHandle::stop`] is called or when the
/// token it was spawned under is cancelled.
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Check if the sweeper task is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the sweeper and wait for its task to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Cache sweeper task ended abnormally");
        }
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Spawn the periodic sweeper on the current Tokio runtime.
    ///
    /// The first sweep runs one `sweep_interval` after spawning. Cancelling
    /// `shutdown` (or any of its parents) stops the sweeper as well.
    pub fn spawn_sweeper(&self, shutdown: &CancellationToken) -> SweeperHandle {
        let cancel = shutdown.child_token();
        let period = self.config().sweep_interval;
        let cache = self.clone();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(interval_ms = period.as_millis() as u64, "Cache sweeper started");
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        info!("Cache sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = cache.cleanup_expired();
                        debug!(removed, "Cache sweep finished");
                    }
                }
            }
        });

        SweeperHandle { cancel, handle }
    }
}
