//! Consumer side of the session event channel.
//!
//! Records the terminal status of every finished session in the history
//! store and notifies the user when the session has a vendor identity.

use std::sync::Arc;
use std::time::Duration;

use attune_types::{FocusStatus, Trigger};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::event::SessionFinished;
use crate::notifier::{Notification, NotificationKind, Notifier};
use crate::store::FocusStore;

/// Applies finish events to history and notifies recipients.
#[derive(Clone)]
pub struct TriggerDispatcher {
    store: Arc<dyn FocusStore>,
    notifier: Arc<dyn Notifier>,
}

impl TriggerDispatcher {
    pub fn new(store: Arc<dyn FocusStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Handle one finish event.
    ///
    /// The notification goes out whatever happened to the history update,
    /// and a history error is returned only after it was sent. A history
    /// record that is missing or already terminal is left as is. Delivery
    /// failures are logged, not returned.
    pub async fn handle(&self, event: &SessionFinished) -> Result<()> {
        let recorded = self.record_history(event).await;

        match event.trigger() {
            Some(trigger) => self.notify(&trigger, event.duration).await,
            None => debug!(identity = %event.identity, "No vendor identity, notification skipped"),
        }
        recorded
    }

    async fn record_history(&self, event: &SessionFinished) -> Result<()> {
        let Some(mut session) = self.store.get(event.session_id).await? else {
            warn!(
                identity = %event.identity,
                session_id = %event.session_id,
                "No history record for finished session"
            );
            return Ok(());
        };

        if session.status.is_terminal() {
            debug!(session_id = %session.id, status = %session.status, "History already final");
            return Ok(());
        }
        session.finish(event.status, event.ended_at);
        self.store.update(&session).await?;
        Ok(())
    }

    async fn notify(&self, trigger: &Trigger, duration: Duration) {
        let notification = Notification::new(
            NotificationKind::Push,
            trigger.identity.clone(),
            title_for(trigger.status),
            message_for(duration, trigger.status),
        );
        match notification {
            Ok(notification) => {
                if let Err(e) = self.notifier.send(&notification).await {
                    warn!(recipient = %trigger.identity, error = %e, "Notification failed");
                }
            }
            Err(e) => warn!(recipient = %trigger.identity, error = %e, "Notification rejected"),
        }
    }

    /// Consume events until the channel closes or `shutdown` is cancelled.
    ///
    /// On cancellation, events already buffered in the channel are still
    /// handled before the task exits.
    pub fn spawn(
        self,
        mut rx: mpsc::Receiver<SessionFinished>,
        shutdown: &CancellationToken,
    ) -> DispatcherHandle {
        let cancel = shutdown.child_token();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        while let Ok(event) = rx.try_recv() {
                            self.handle_logged(&event).await;
                        }
                        info!("Trigger dispatcher shutting down");
                        break;
                    }
                    next = rx.recv() => match next {
                        Some(event) => self.handle_logged(&event).await,
                        None => {
                            debug!("Event channel closed");
                            break;
                        }
                    },
                }
            }
        });

        DispatcherHandle { cancel, handle }
    }

    async fn handle_logged(&self, event: &SessionFinished) {
        match self.handle(event).await {
            Ok(()) => debug!(
                identity = %event.identity,
                session_id = %event.session_id,
                status = %event.status,
                "Finish event dispatched"
            ),
            Err(e) => warn!(
                identity = %event.identity,
                session_id = %event.session_id,
                error = %e,
                "Finish event dispatch failed"
            ),
        }
    }
}

fn title_for(status: FocusStatus) -> &'static str {
    match status {
        FocusStatus::Completed => "Focus session complete",
        FocusStatus::Stopped => "Focus session stopped",
        FocusStatus::Active => "Focus session update",
    }
}

fn message_for(duration: Duration, status: FocusStatus) -> String {
    let minutes = duration.as_secs() / 60;
    let seconds = duration.as_secs() % 60;
    let length = if minutes == 0 {
        format!("{seconds}s")
    } else if seconds == 0 {
        format!("{minutes}m")
    } else {
        format!("{minutes}m{seconds}s")
    };

    match status {
        FocusStatus::Completed => {
            format!("Your {length} focus session is done. Take a break and rate how it went.")
        }
        _ => format!("Your {length} focus session was stopped early."),
    }
}

/// Handle to a running dispatcher task.
#[derive(Debug)]
pub struct DispatcherHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl DispatcherHandle {
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Wait for the dispatcher to exit on its own (channel closed or parent
    /// token cancelled).
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Trigger dispatcher task failed");
        }
    }

    /// Cancel the dispatcher, then wait for it to drain and exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        self.join().await;
    }
}
