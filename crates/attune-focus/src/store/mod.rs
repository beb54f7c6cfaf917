//! Focus session history storage.
//!
//! ```text
//! FocusStore (trait)          - CRUD over FocusSession records
//!     └── SqliteFocusStore    - rusqlite implementation
//!     └── InMemoryFocusStore  - map-backed implementation for tests and ephemeral runs
//! ```

mod memory;
mod sqlite;

pub use memory::InMemoryFocusStore;
pub use sqlite::SqliteFocusStore;

use async_trait::async_trait;
use attune_types::{FocusSession, FocusSessionId, FocusStatus};

/// Error type for history storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored row could not be decoded.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for history storage.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Filter for listing sessions. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct FocusFilter {
    pub user_id: Option<String>,
    pub status: Option<FocusStatus>,
    pub limit: Option<usize>,
}

impl FocusFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_status(mut self, status: FocusStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, session: &FocusSession) -> bool {
        self.user_id.as_deref().is_none_or(|u| u == session.user_id)
            && self.status.is_none_or(|s| s == session.status)
    }
}

/// Storage backend for focus session history.
#[async_trait]
pub trait FocusStore: Send + Sync {
    /// Insert a new session. Fails if the id already exists.
    async fn create(&self, session: &FocusSession) -> StoreResult<()>;

    /// Get a session by id.
    async fn get(&self, id: FocusSessionId) -> StoreResult<Option<FocusSession>>;

    /// List sessions matching the filter.
    async fn list(&self, filter: &FocusFilter) -> StoreResult<Vec<FocusSession>>;

    /// Replace a stored session. `NotFound` if it does not exist.
    async fn update(&self, session: &FocusSession) -> StoreResult<()>;

    /// Delete a session. Returns whether it existed.
    async fn delete(&self, id: FocusSessionId) -> StoreResult<bool>;
}
