//! Application-facing facade over the lifecycle manager and history store.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use attune_types::{FocusSession, FocusSessionId, MAX_QUALITY};
use tracing::{error, info, warn};

use crate::error::{FocusError, Result};
use crate::manager::FocusManager;
use crate::record::{SessionSnapshot, StartRequest};
use crate::store::{FocusFilter, FocusStore};

/// Request to start a focus session.
#[derive(Debug, Clone)]
pub struct CreateFocusRequest {
    pub user_id: String,
    /// Notification address; empty means no notification.
    pub vendor_id: String,
    pub duration: Duration,
}

impl CreateFocusRequest {
    pub fn new(user_id: impl Into<String>, duration: Duration) -> Self {
        Self {
            user_id: user_id.into(),
            vendor_id: String::new(),
            duration,
        }
    }

    pub fn with_vendor_id(mut self, vendor_id: impl Into<String>) -> Self {
        self.vendor_id = vendor_id.into();
        self
    }
}

/// Control action on a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusAction {
    Pause,
    Resume,
    Stop,
}

impl FocusAction {
    pub fn as_str(self) -> &'static str {
        match self {
            FocusAction::Pause => "pause",
            FocusAction::Resume => "resume",
            FocusAction::Stop => "stop",
        }
    }
}

impl fmt::Display for FocusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FocusAction {
    type Err = FocusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pause" => Ok(FocusAction::Pause),
            "resume" => Ok(FocusAction::Resume),
            "stop" => Ok(FocusAction::Stop),
            other => Err(FocusError::Validation(format!("unknown action '{other}'"))),
        }
    }
}

/// Focus session operations for the outer surface.
#[derive(Clone)]
pub struct FocusService {
    manager: FocusManager,
    store: Arc<dyn FocusStore>,
}

impl FocusService {
    pub fn new(manager: FocusManager, store: Arc<dyn FocusStore>) -> Self {
        Self { manager, store }
    }

    pub fn manager(&self) -> &FocusManager {
        &self.manager
    }

    /// Record a new session in history and start its timer.
    ///
    /// If the timer cannot be started the history record is removed again.
    pub async fn create(&self, request: CreateFocusRequest) -> Result<FocusSession> {
        if request.user_id.trim().is_empty() {
            return Err(FocusError::Validation("user id must not be empty".to_string()));
        }
        self.manager.validate_duration(request.duration)?;

        let session =
            FocusSession::new(&request.user_id, request.duration).with_vendor_id(&request.vendor_id);
        self.store.create(&session).await?;

        let start = StartRequest::new(&request.user_id, request.duration)
            .with_vendor(&request.vendor_id)
            .with_session_id(session.id);

        if let Err(e) = self.manager.start(start) {
            if let Err(cleanup) = self.store.delete(session.id).await {
                error!(
                    session_id = %session.id,
                    error = %cleanup,
                    "Failed to remove history of unstarted session"
                );
            }
            return Err(e);
        }

        info!(
            user_id = %session.user_id,
            session_id = %session.id,
            duration_secs = session.duration.as_secs(),
            "Focus session created"
        );
        Ok(session)
    }

    /// Pause, resume or stop the user's running session.
    pub fn apply(&self, user_id: &str, action: FocusAction) -> Result<()> {
        let result = match action {
            FocusAction::Pause => self.manager.pause(user_id).map(|_| ()),
            FocusAction::Resume => self.manager.resume(user_id).map(|_| ()),
            FocusAction::Stop => self.manager.stop(user_id),
        };
        if let Err(e) = &result
            && !e.is_recoverable()
        {
            error!(user_id = %user_id, action = %action, error = %e, "Focus action failed");
        }
        result
    }

    /// Live state of the user's session.
    pub fn status(&self, user_id: &str) -> Result<SessionSnapshot> {
        self.manager.snapshot(user_id)
    }

    /// Set the self-rated quality of a finished session.
    pub async fn rate(&self, id: FocusSessionId, quality: u8) -> Result<FocusSession> {
        let mut session = self.get(id).await?;
        if !session.status.is_terminal() {
            return Err(FocusError::InvalidState(
                "only finished sessions can be rated".to_string(),
            ));
        }
        if !session.rate(quality) {
            return Err(FocusError::Validation(format!(
                "quality must be between 0 and {MAX_QUALITY}"
            )));
        }
        self.store.update(&session).await?;
        Ok(session)
    }

    /// Session history, newest first.
    pub async fn list(&self, filter: &FocusFilter) -> Result<Vec<FocusSession>> {
        Ok(self.store.list(filter).await?)
    }

    pub async fn get(&self, id: FocusSessionId) -> Result<FocusSession> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| FocusError::NotFound(id.to_string()))
    }

    /// Delete a session from history.
    ///
    /// A session that is still running must be stopped first. A record left
    /// unfinished by a session that was swept while paused can be deleted.
    pub async fn delete(&self, id: FocusSessionId) -> Result<()> {
        let session = self.get(id).await?;
        if !session.status.is_terminal() && self.is_live(&session) {
            return Err(FocusError::InvalidState(
                "stop the session before deleting it".to_string(),
            ));
        }
        if !self.store.delete(id).await? {
            warn!(session_id = %id, "Session vanished before delete");
            return Err(FocusError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Whether the manager still runs this history record.
    fn is_live(&self, session: &FocusSession) -> bool {
        self.manager
            .snapshot(&session.user_id)
            .is_ok_and(|live| live.session_id == session.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ManagerConfig;
    use crate::store::InMemoryFocusStore;
    use crate::event::SessionFinished;
    use attune_cache::{CacheConfig, TtlCache};
    use attune_types::FocusStatus;
    use tokio::sync::mpsc;

    fn service() -> (FocusService, Arc<InMemoryFocusStore>, mpsc::Receiver<SessionFinished>) {
        let (tx, rx) = mpsc::channel(8);
        let manager = FocusManager::new(
            TtlCache::new(CacheConfig::new()),
            tx,
            ManagerConfig::new().with_duration_bounds(Duration::from_secs(1), Duration::from_secs(3600)),
        );
        let store = Arc::new(InMemoryFocusStore::new());
        (FocusService::new(manager, store.clone()), store, rx)
    }

    #[test]
    fn test_parse_action() {
        assert_eq!("pause".parse::<FocusAction>().unwrap(), FocusAction::Pause);
        assert_eq!(" Resume ".parse::<FocusAction>().unwrap(), FocusAction::Resume);
        assert_eq!("STOP".parse::<FocusAction>().unwrap(), FocusAction::Stop);
        assert!(matches!(
            "quality".parse::<FocusAction>(),
            Err(FocusError::Validation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_records_history_and_starts() {
        let (service, store, _rx) = service();
        let session = service
            .create(CreateFocusRequest::new("u1", Duration::from_secs(60)).with_vendor_id("v1"))
            .await
            .unwrap();

        assert!(store.get(session.id).await.unwrap().is_some());
        let status = service.status("u1").unwrap();
        assert_eq!(status.session_id, session.id);
        assert!(!status.paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflicting_create_leaves_no_history() {
        let (service, store, _rx) = service();
        service
            .create(CreateFocusRequest::new("u1", Duration::from_secs(60)))
            .await
            .unwrap();

        let err = service
            .create(CreateFocusRequest::new("u1", Duration::from_secs(60)))
            .await
            .unwrap_err();
        assert!(matches!(err, FocusError::Conflict(_)));
        assert_eq!(store.list(&FocusFilter::new()).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_create_rejected_before_storage() {
        let (service, store, _rx) = service();
        assert!(matches!(
            service.create(CreateFocusRequest::new("u1", Duration::ZERO)).await,
            Err(FocusError::Validation(_))
        ));
        assert!(matches!(
            service.create(CreateFocusRequest::new(" ", Duration::from_secs(60))).await,
            Err(FocusError::Validation(_))
        ));
        assert!(store.list(&FocusFilter::new()).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_actions() {
        let (service, _store, _rx) = service();
        service
            .create(CreateFocusRequest::new("u1", Duration::from_secs(60)))
            .await
            .unwrap();

        service.apply("u1", FocusAction::Pause).unwrap();
        assert!(service.status("u1").unwrap().paused);
        service.apply("u1", FocusAction::Resume).unwrap();
        service.apply("u1", FocusAction::Stop).unwrap();
        assert!(matches!(
            service.apply("u1", FocusAction::Stop),
            Err(FocusError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_and_delete_require_finished_session() {
        let (service, store, _rx) = service();
        let mut session = service
            .create(CreateFocusRequest::new("u1", Duration::from_secs(60)))
            .await
            .unwrap();

        assert!(matches!(
            service.rate(session.id, 5).await,
            Err(FocusError::InvalidState(_))
        ));
        assert!(matches!(
            service.delete(session.id).await,
            Err(FocusError::InvalidState(_))
        ));

        session.finish(FocusStatus::Completed, attune_types::now());
        store.update(&session).await.unwrap();

        assert!(matches!(
            service.rate(session.id, 11).await,
            Err(FocusError::Validation(_))
        ));
        assert_eq!(service.rate(session.id, 8).await.unwrap().quality, 8);

        service.delete(session.id).await.unwrap();
        assert!(matches!(
            service.get(session.id).await,
            Err(FocusError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_vendorless_session_reports_event() {
        let (service, _store, mut rx) = service();
        let session = service
            .create(CreateFocusRequest::new("u1", Duration::from_secs(60)))
            .await
            .unwrap();
        service.apply("u1", FocusAction::Stop).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.session_id, session.id);
        assert_eq!(event.status, FocusStatus::Stopped);
        assert!(event.trigger().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_abandoned_session() {
        let records = TtlCache::new(CacheConfig::new());
        let (tx, _rx) = mpsc::channel(8);
        let manager = FocusManager::new(
            records.clone(),
            tx,
            ManagerConfig::new().with_duration_bounds(Duration::from_secs(1), Duration::from_secs(3600)),
        );
        let store = Arc::new(InMemoryFocusStore::new());
        let service = FocusService::new(manager, store.clone());

        let session = service
            .create(CreateFocusRequest::new("u1", Duration::from_secs(60)))
            .await
            .unwrap();
        service.apply("u1", FocusAction::Pause).unwrap();
        assert!(matches!(
            service.delete(session.id).await,
            Err(FocusError::InvalidState(_))
        ));

        // Dropped without finishing, as the sweeper does with expired records.
        records.delete("u1");
        assert_eq!(
            store.get(session.id).await.unwrap().unwrap().status,
            FocusStatus::Active
        );

        service.delete(session.id).await.unwrap();
        assert!(store.get(session.id).await.unwrap().is_none());
    }
}
