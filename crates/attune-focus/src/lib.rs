//! Focus session lifecycle for Attune.
//!
//! [`FocusManager`] runs timed sessions keyed by user identity, with pause,
//! resume and stop. Each terminal transition is announced exactly once as a
//! [`SessionFinished`] event on an outbound channel. [`TriggerDispatcher`]
//! records it in history and, when the session has a vendor identity, turns
//! its [`Trigger`](attune_types::Trigger) into a user notification.
//! [`FocusService`] ties the manager to the history [`FocusStore`].
//!
//! ```text
//! FocusService ──start/pause/resume/stop──▶ FocusManager ──▶ TtlCache<Arc<SessionRecord>>
//!      │                                         │
//!      ▼                                         ▼ mpsc<SessionFinished>
//!  FocusStore ◀──────── finish ─────────── TriggerDispatcher ──Trigger──▶ Notifier
//! ```

pub mod dispatch;
pub mod error;
pub mod event;
pub mod manager;
pub mod notifier;
pub mod record;
pub mod service;
pub mod store;

pub use dispatch::{DispatcherHandle, TriggerDispatcher};
pub use error::{ErrorKind, FocusError, Result};
pub use event::SessionFinished;
pub use manager::{FocusManager, ManagerConfig, RecordCache};
pub use notifier::{LogNotifier, Notification, NotificationKind, Notifier, NotifyError};
pub use record::{SessionRecord, SessionSnapshot, StartRequest};
pub use service::{CreateFocusRequest, FocusAction, FocusService};
pub use store::{
    FocusFilter, FocusStore, InMemoryFocusStore, SqliteFocusStore, StoreError, StoreResult,
};
