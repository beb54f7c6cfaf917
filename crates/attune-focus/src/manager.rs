//! Focus session lifecycle manager.
//!
//! Each running interval of a session is driven by one watcher task that
//! waits for whichever comes first: the interval timer, the interval's pause
//! signal, or the session's stop signal. Pause, resume and stop never wait;
//! they take the record lock, mutate, signal, and return.

use std::sync::Arc;
use std::time::Duration;

use attune_cache::TtlCache;
use attune_types::{FocusStatus, HasFocusConfig, Timestamp, config_defaults};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{FocusError, Result};
use crate::event::SessionFinished;
use crate::record::{Interval, SessionRecord, SessionSnapshot, StartRequest, StopOutcome};

/// Typed store of live session records, keyed by identity.
pub type RecordCache = TtlCache<Arc<SessionRecord>>;

/// Limits applied by the manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Extra TTL kept on a record beyond its remaining duration.
    pub safety_window: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            safety_window: config_defaults::safety_window(),
            min_duration: config_defaults::min_duration(),
            max_duration: config_defaults::max_duration(),
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any configuration provider.
    pub fn from_provider<C: HasFocusConfig>(config: &C) -> Self {
        Self {
            safety_window: config.safety_window(),
            min_duration: config.min_duration(),
            max_duration: config.max_duration(),
        }
    }

    pub fn with_safety_window(mut self, window: Duration) -> Self {
        self.safety_window = window;
        self
    }

    pub fn with_duration_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.min_duration = min;
        self.max_duration = max;
        self
    }
}

struct ManagerInner {
    records: RecordCache,
    events: mpsc::Sender<SessionFinished>,
    config: ManagerConfig,
}

/// Starts, pauses, resumes and stops focus sessions.
///
/// Must be used from within a Tokio runtime: starting and resuming spawn
/// watcher tasks. Clones share the same state.
#[derive(Clone)]
pub struct FocusManager {
    inner: Arc<ManagerInner>,
}

impl FocusManager {
    /// Create a manager over an explicitly owned record cache.
    ///
    /// The caller owns the cache's sweeper and the receiving end of
    /// `events`, which sees one event per finished session.
    pub fn new(
        records: RecordCache,
        events: mpsc::Sender<SessionFinished>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                records,
                events,
                config,
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Reject durations outside the configured bounds.
    pub fn validate_duration(&self, duration: Duration) -> Result<()> {
        let config = &self.inner.config;
        if duration.is_zero() {
            return Err(FocusError::Validation("duration must be positive".to_string()));
        }
        if duration < config.min_duration || duration > config.max_duration {
            return Err(FocusError::Validation(format!(
                "duration must be between {}s and {}s",
                config.min_duration.as_secs_f64(),
                config.max_duration.as_secs_f64()
            )));
        }
        Ok(())
    }

    /// Start a session and its watcher. Returns without waiting for the
    /// session to end.
    ///
    /// Fails with `Conflict` if a live session exists for the identity; the
    /// existing session is left untouched.
    pub fn start(&self, request: StartRequest) -> Result<SessionSnapshot> {
        if request.identity.is_empty() {
            return Err(FocusError::Validation("identity must not be empty".to_string()));
        }
        self.validate_duration(request.duration)?;

        let record = Arc::new(SessionRecord::new(&request));
        let ttl = request
            .duration
            .saturating_add(self.inner.config.safety_window);

        if !self
            .inner
            .records
            .insert_if_absent(&request.identity, Arc::clone(&record), Some(ttl))
        {
            debug!(identity = %request.identity, "Start rejected, session already active");
            return Err(FocusError::Conflict(request.identity));
        }

        let interval = record.first_interval();
        self.inner.spawn_watcher(Arc::clone(&record), interval);

        info!(
            identity = %request.identity,
            session_id = %request.session_id,
            duration_secs = request.duration.as_secs(),
            "Focus session started"
        );
        Ok(record.snapshot())
    }

    /// Pause the running interval. Returns the time left to run.
    pub fn pause(&self, identity: &str) -> Result<Duration> {
        let record = self.lookup(identity)?;
        let remaining = record.pause()?;
        debug!(identity = %identity, remaining_ms = remaining.as_millis() as u64, "Focus session paused");
        Ok(remaining)
    }

    /// Resume a paused session with a new watcher.
    pub fn resume(&self, identity: &str) -> Result<Duration> {
        let record = self.lookup(identity)?;
        let interval = record.resume()?;
        let remaining = interval.remaining;

        // The original TTL assumed an uninterrupted run.
        let ttl = remaining.saturating_add(self.inner.config.safety_window);
        self.inner
            .records
            .extend_ttl_if(identity, ttl, |r| Arc::ptr_eq(r, &record));

        self.inner.spawn_watcher(record, interval);
        debug!(identity = %identity, remaining_ms = remaining.as_millis() as u64, "Focus session resumed");
        Ok(remaining)
    }

    /// Stop a session. It is announced with status `Stopped`.
    ///
    /// The record is gone when this returns, so stopping again yields
    /// `NotFound`.
    pub fn stop(&self, identity: &str) -> Result<()> {
        let record = self.lookup(identity)?;
        match record.request_stop()? {
            StopOutcome::Signalled => {
                debug!(identity = %identity, "Stop signalled to watcher");
            }
            StopOutcome::Finished(ended_at) => {
                info!(identity = %identity, status = %FocusStatus::Stopped, "Focus session finished");
                self.inner.announce(&record, FocusStatus::Stopped, ended_at);
            }
        }
        self.inner.evict(&record);
        Ok(())
    }

    /// Stop every live session. Returns how many were stopped.
    pub fn stop_all(&self) -> usize {
        self.inner
            .records
            .keys()
            .iter()
            .filter(|identity| self.stop(identity.as_str()).is_ok())
            .count()
    }

    /// Current view of a session.
    pub fn snapshot(&self, identity: &str) -> Result<SessionSnapshot> {
        Ok(self.lookup(identity)?.snapshot())
    }

    /// Identities with a live session.
    pub fn active_identities(&self) -> Vec<String> {
        self.inner.records.keys()
    }

    fn lookup(&self, identity: &str) -> Result<Arc<SessionRecord>> {
        let record = self
            .inner
            .records
            .get(identity)
            .ok_or_else(|| FocusError::NotFound(identity.to_string()))?;

        if record.identity() != identity {
            error!(
                key = %identity,
                record_identity = %record.identity(),
                "Session record stored under a foreign key"
            );
            return Err(FocusError::Internal(format!(
                "record for '{}' stored under '{}'",
                record.identity(),
                identity
            )));
        }
        Ok(record)
    }
}

impl ManagerInner {
    fn spawn_watcher(self: &Arc<Self>, record: Arc<SessionRecord>, interval: Interval) {
        let inner = Arc::clone(self);
        tokio::spawn(async move { inner.watch(record, interval).await });
    }

    /// Drive one running interval to its end.
    async fn watch(&self, record: Arc<SessionRecord>, interval: Interval) {
        // Dropping the sleep on the pause/stop arms discards any pending
        // timer wakeup along with it.
        let timer = tokio::time::sleep(interval.remaining);
        tokio::select! {
            biased;
            _ = record.stop_signal().cancelled() => {
                self.complete(&record, FocusStatus::Stopped);
            }
            _ = interval.pause.cancelled() => {
                debug!(identity = %record.identity(), "Watcher halted by pause");
            }
            _ = timer => {
                self.complete(&record, FocusStatus::Completed);
            }
        }
    }

    /// Terminal transition, announcement and cleanup. Runs at most once per record.
    fn complete(&self, record: &Arc<SessionRecord>, status: FocusStatus) {
        let Some((status, ended_at)) = record.finish(status) else {
            debug!(identity = %record.identity(), "Watcher yielded to a paused or finished session");
            return;
        };

        info!(identity = %record.identity(), status = %status, "Focus session finished");
        self.announce(record, status, ended_at);
        self.evict(record);
    }

    /// Send the finish event without holding up cleanup.
    fn announce(&self, record: &SessionRecord, status: FocusStatus, ended_at: Timestamp) {
        let event = SessionFinished {
            identity: record.identity().to_string(),
            vendor_identity: record.vendor_identity().to_string(),
            session_id: record.session_id(),
            status,
            duration: record.duration(),
            ended_at,
        };
        let tx = self.events.clone();
        tokio::spawn(async move {
            if let Err(e) = tx.send(event).await {
                warn!(
                    identity = %e.0.identity,
                    status = %e.0.status,
                    "Event receiver closed, finish event dropped"
                );
            }
        });
    }

    /// Remove the record, unless its slot was already taken by a newer session.
    fn evict(&self, record: &Arc<SessionRecord>) {
        self.records
            .remove_if(record.identity(), |current| Arc::ptr_eq(current, record));
    }
}
