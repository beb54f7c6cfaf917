//! In-memory timer and pause state of one running focus session.
//!
//! All mutable fields live behind the record's own mutex. The cache that
//! stores records never protects them.

use std::time::Duration;

use attune_types::{FocusSessionId, FocusStatus, Timestamp, now};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{FocusError, Result};

/// Parameters for starting a session.
#[derive(Debug, Clone)]
pub struct StartRequest {
    /// Key of the session; one live session per identity.
    pub identity: String,
    /// Notification address. Empty means no trigger is emitted.
    pub vendor_identity: String,
    pub duration: Duration,
    /// History record this run belongs to.
    pub session_id: FocusSessionId,
}

impl StartRequest {
    pub fn new(identity: impl Into<String>, duration: Duration) -> Self {
        Self {
            identity: identity.into(),
            vendor_identity: String::new(),
            duration,
            session_id: FocusSessionId::new(),
        }
    }

    pub fn with_vendor(mut self, vendor_identity: impl Into<String>) -> Self {
        self.vendor_identity = vendor_identity.into();
        self
    }

    pub fn with_session_id(mut self, session_id: FocusSessionId) -> Self {
        self.session_id = session_id;
        self
    }
}

/// One running interval handed to a watcher.
#[derive(Debug, Clone)]
pub(crate) struct Interval {
    pub remaining: Duration,
    pub pause: CancellationToken,
}

/// What a stop request turned into.
#[derive(Debug)]
pub(crate) enum StopOutcome {
    /// The running watcher was signalled and will complete the session.
    Signalled,
    /// The session was paused; it is now stopped, ended at the given time.
    Finished(Timestamp),
}

#[derive(Debug)]
struct RecordState {
    status: FocusStatus,
    /// Time left to run. Exact only while paused or before the first interval ends.
    remaining: Duration,
    last_resumed_at: Instant,
    paused: bool,
    /// A stop was accepted; the watcher has not completed the session yet.
    stopping: bool,
    ended_at: Option<Timestamp>,
    /// Pause signal of the current interval. Replaced on every resume.
    pause: CancellationToken,
}

impl RecordState {
    fn remaining_at(&self, at: Instant) -> Duration {
        if self.paused || self.status.is_terminal() {
            self.remaining
        } else {
            self.remaining
                .saturating_sub(at.saturating_duration_since(self.last_resumed_at))
        }
    }

    fn check_live(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(FocusError::InvalidState(format!(
                "session already {}",
                self.status
            )));
        }
        if self.stopping {
            return Err(FocusError::InvalidState("session is stopping".to_string()));
        }
        Ok(())
    }
}

/// Live state of one focus session, shared by the manager and its watcher.
#[derive(Debug)]
pub struct SessionRecord {
    identity: String,
    vendor_identity: String,
    session_id: FocusSessionId,
    duration: Duration,
    started_at: Timestamp,
    /// Session-wide stop signal, observed by whichever watcher is live.
    stop: CancellationToken,
    state: Mutex<RecordState>,
}

impl SessionRecord {
    pub(crate) fn new(request: &StartRequest) -> Self {
        Self {
            identity: request.identity.clone(),
            vendor_identity: request.vendor_identity.clone(),
            session_id: request.session_id,
            duration: request.duration,
            started_at: now(),
            stop: CancellationToken::new(),
            state: Mutex::new(RecordState {
                status: FocusStatus::Active,
                remaining: request.duration,
                last_resumed_at: Instant::now(),
                paused: false,
                stopping: false,
                ended_at: None,
                pause: CancellationToken::new(),
            }),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn vendor_identity(&self) -> &str {
        &self.vendor_identity
    }

    pub fn session_id(&self) -> FocusSessionId {
        self.session_id
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn status(&self) -> FocusStatus {
        self.state.lock().status
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub(crate) fn stop_signal(&self) -> &CancellationToken {
        &self.stop
    }

    /// The interval armed at construction.
    pub(crate) fn first_interval(&self) -> Interval {
        let state = self.state.lock();
        Interval {
            remaining: state.remaining,
            pause: state.pause.clone(),
        }
    }

    /// Halt the running interval and bank the elapsed time.
    ///
    /// Returns the time left to run.
    pub(crate) fn pause(&self) -> Result<Duration> {
        let mut state = self.state.lock();
        state.check_live()?;
        if state.paused {
            return Err(FocusError::InvalidState(
                "session is already paused".to_string(),
            ));
        }

        state.remaining = state.remaining_at(Instant::now());
        state.paused = true;
        state.pause.cancel();
        Ok(state.remaining)
    }

    /// Start a new interval for the banked remaining time.
    ///
    /// The returned interval carries a fresh pause signal, so a signal from
    /// the previous interval can never reach the new watcher.
    pub(crate) fn resume(&self) -> Result<Interval> {
        let mut state = self.state.lock();
        state.check_live()?;
        if !state.paused {
            return Err(FocusError::InvalidState("session is not paused".to_string()));
        }

        state.last_resumed_at = Instant::now();
        state.paused = false;
        state.pause = CancellationToken::new();
        Ok(Interval {
            remaining: state.remaining,
            pause: state.pause.clone(),
        })
    }

    /// Accept a stop request.
    ///
    /// A running session is handed to its watcher through the stop signal.
    /// A paused session has no watcher and is finished here.
    pub(crate) fn request_stop(&self) -> Result<StopOutcome> {
        let mut state = self.state.lock();
        if state.status.is_terminal() || state.stopping {
            return Err(FocusError::NotFound(self.identity.clone()));
        }

        state.stopping = true;
        if state.paused {
            let ended_at = now();
            state.status = FocusStatus::Stopped;
            state.ended_at = Some(ended_at);
            return Ok(StopOutcome::Finished(ended_at));
        }

        self.stop.cancel();
        Ok(StopOutcome::Signalled)
    }

    /// Move to a terminal status.
    ///
    /// Whichever request took the lock first decides: an accepted stop turns
    /// any finish into `Stopped`, and an accepted pause holds back
    /// completion until the session is resumed.
    ///
    /// Returns the status and end time if this call made the transition,
    /// `None` if the record was already terminal or is paused.
    pub(crate) fn finish(&self, status: FocusStatus) -> Option<(FocusStatus, Timestamp)> {
        debug_assert!(status.is_terminal());
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            return None;
        }

        let status = if state.stopping {
            FocusStatus::Stopped
        } else if state.paused {
            return None;
        } else {
            status
        };

        let ended_at = now();
        state.remaining = state.remaining_at(Instant::now());
        state.status = status;
        state.ended_at = Some(ended_at);
        Some((status, ended_at))
    }

    /// Consistent read-only view of the record.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            identity: self.identity.clone(),
            vendor_identity: self.vendor_identity.clone(),
            session_id: self.session_id,
            status: state.status,
            paused: state.paused,
            remaining: state.remaining_at(Instant::now()),
            duration: self.duration,
            started_at: self.started_at,
            ended_at: state.ended_at,
        }
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub identity: String,
    pub vendor_identity: String,
    pub session_id: FocusSessionId,
    pub status: FocusStatus,
    pub paused: bool,
    /// Time left to run, computed at snapshot time.
    pub remaining: Duration,
    pub duration: Duration,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
}
