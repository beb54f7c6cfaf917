//! End-to-end tests: service, manager, cache sweeper, dispatcher and SQLite history.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use attune_cache::{CacheConfig, TtlCache};
use attune_focus::{
    CreateFocusRequest, FocusAction, FocusError, FocusFilter, FocusManager, FocusService,
    FocusStore, ManagerConfig, Notification, Notifier, NotifyError, SqliteFocusStore,
    TriggerDispatcher,
};
use attune_types::{FocusSessionId, FocusStatus};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Inbox(Mutex<Vec<Notification>>);

#[async_trait]
impl Notifier for Inbox {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.0.lock().push(notification.clone());
        Ok(())
    }
}

struct Harness {
    service: FocusService,
    store: Arc<SqliteFocusStore>,
    records: TtlCache<Arc<attune_focus::SessionRecord>>,
    inbox: Arc<Inbox>,
    shutdown: CancellationToken,
    _dir: tempfile::TempDir,
}

fn harness(safety_window: Duration) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteFocusStore::open(dir.path().join("attune.db")).unwrap());
    let inbox = Arc::new(Inbox::default());
    let shutdown = CancellationToken::new();

    let records = TtlCache::new(CacheConfig::new().with_sweep_interval(Duration::from_secs(1)));
    // The sweeper stops with the shutdown token.
    let _sweeper = records.spawn_sweeper(&shutdown);

    let (tx, rx) = mpsc::channel(16);
    let manager = FocusManager::new(
        records.clone(),
        tx,
        ManagerConfig::new()
            .with_safety_window(safety_window)
            .with_duration_bounds(Duration::from_secs(1), Duration::from_secs(3600)),
    );
    let _dispatcher = TriggerDispatcher::new(store.clone(), inbox.clone()).spawn(rx, &shutdown);

    Harness {
        service: FocusService::new(manager, store.clone()),
        store,
        records,
        inbox,
        shutdown,
        _dir: dir,
    }
}

async fn wait_for_status(store: &SqliteFocusStore, id: FocusSessionId, status: FocusStatus) {
    for _ in 0..100 {
        if store.get(id).await.unwrap().is_some_and(|s| s.status == status) {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("session {id} never reached {status}");
}

#[tokio::test(start_paused = true)]
async fn completed_session_updates_history_and_notifies() {
    let h = harness(Duration::from_secs(180));
    let session = h
        .service
        .create(CreateFocusRequest::new("u1", Duration::from_secs(2)).with_vendor_id("chat-1"))
        .await
        .unwrap();

    sleep(Duration::from_millis(500)).await;
    h.service.apply("u1", FocusAction::Pause).unwrap();
    sleep(Duration::from_secs(1)).await;
    h.service.apply("u1", FocusAction::Resume).unwrap();

    wait_for_status(&h.store, session.id, FocusStatus::Completed).await;

    let stored = h.store.get(session.id).await.unwrap().unwrap();
    assert!(stored.ended_at.is_some());
    assert!(matches!(h.service.status("u1"), Err(FocusError::NotFound(_))));

    let inbox = h.inbox.0.lock();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].recipient, "chat-1");
    drop(inbox);

    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn stopped_session_can_be_rated() {
    let h = harness(Duration::from_secs(180));
    let session = h
        .service
        .create(CreateFocusRequest::new("u1", Duration::from_secs(600)).with_vendor_id("chat-1"))
        .await
        .unwrap();

    h.service.apply("u1", FocusAction::Stop).unwrap();
    wait_for_status(&h.store, session.id, FocusStatus::Stopped).await;

    let rated = h.service.rate(session.id, 9).await.unwrap();
    assert_eq!(rated.quality, 9);

    let history = h
        .service
        .list(&FocusFilter::new().for_user("u1"))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].quality, 9);
    assert_eq!(history[0].status, FocusStatus::Stopped);

    // A new session may start once the previous one is gone.
    h.service
        .create(CreateFocusRequest::new("u1", Duration::from_secs(60)))
        .await
        .unwrap();

    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn session_without_vendor_finishes_silently() {
    let h = harness(Duration::from_secs(180));
    let completed = h
        .service
        .create(CreateFocusRequest::new("u1", Duration::from_secs(2)))
        .await
        .unwrap();
    let stopped = h
        .service
        .create(CreateFocusRequest::new("u2", Duration::from_secs(600)))
        .await
        .unwrap();
    h.service.apply("u2", FocusAction::Stop).unwrap();

    wait_for_status(&h.store, completed.id, FocusStatus::Completed).await;
    wait_for_status(&h.store, stopped.id, FocusStatus::Stopped).await;
    assert!(h.records.is_empty());
    assert!(h.inbox.0.lock().is_empty());

    // Finished history can be rated and deleted like any other.
    assert_eq!(h.service.rate(stopped.id, 4).await.unwrap().quality, 4);
    h.service.delete(completed.id).await.unwrap();
    assert!(matches!(
        h.service.get(completed.id).await,
        Err(FocusError::NotFound(_))
    ));

    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn abandoned_paused_session_is_swept() {
    let h = harness(Duration::from_secs(1));
    let session = h
        .service
        .create(CreateFocusRequest::new("u1", Duration::from_secs(2)).with_vendor_id("chat-1"))
        .await
        .unwrap();
    h.service.apply("u1", FocusAction::Pause).unwrap();

    // TTL is 3s from start; the sweeper runs every second.
    sleep(Duration::from_secs(5)).await;

    assert!(h.records.is_empty());
    assert!(h.inbox.0.lock().is_empty());
    assert!(matches!(
        h.service.apply("u1", FocusAction::Resume),
        Err(FocusError::NotFound(_))
    ));

    // Nothing finished it, but its history can still be cleared away.
    h.service.delete(session.id).await.unwrap();

    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_every_session() {
    let h = harness(Duration::from_secs(180));
    let mut ids = Vec::new();
    for user in ["a", "b"] {
        let session = h
            .service
            .create(CreateFocusRequest::new(user, Duration::from_secs(600)).with_vendor_id(user))
            .await
            .unwrap();
        ids.push(session.id);
    }
    h.service.apply("b", FocusAction::Pause).unwrap();

    assert_eq!(h.service.manager().stop_all(), 2);
    for id in ids {
        wait_for_status(&h.store, id, FocusStatus::Stopped).await;
    }
    assert_eq!(h.inbox.0.lock().len(), 2);

    h.shutdown.cancel();
}
