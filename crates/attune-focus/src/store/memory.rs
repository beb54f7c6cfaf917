use std::collections::HashMap;

use async_trait::async_trait;
use attune_types::{FocusSession, FocusSessionId};
use parking_lot::RwLock;

use super::{FocusFilter, FocusStore, StoreError, StoreResult};

/// In-memory history store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct InMemoryFocusStore {
    sessions: RwLock<HashMap<FocusSessionId, FocusSession>>,
}

impl InMemoryFocusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FocusStore for InMemoryFocusStore {
    async fn create(&self, session: &FocusSession) -> StoreResult<()> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session.id) {
            return Err(StoreError::InvalidData(format!(
                "duplicate focus session {}",
                session.id
            )));
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get(&self, id: FocusSessionId) -> StoreResult<Option<FocusSession>> {
        Ok(self.sessions.read().get(&id).cloned())
    }

    async fn list(&self, filter: &FocusFilter) -> StoreResult<Vec<FocusSession>> {
        let mut result: Vec<FocusSession> = self
            .sessions
            .read()
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        if let Some(limit) = filter.limit {
            result.truncate(limit);
        }
        Ok(result)
    }

    async fn update(&self, session: &FocusSession) -> StoreResult<()> {
        match self.sessions.write().get_mut(&session.id) {
            Some(slot) => {
                *slot = session.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("focus session {}", session.id))),
        }
    }

    async fn delete(&self, id: FocusSessionId) -> StoreResult<bool> {
        Ok(self.sessions.write().remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attune_types::FocusStatus;
    use std::time::Duration;

    #[tokio::test]
    async fn test_crud() {
        let store = InMemoryFocusStore::new();
        let mut session = FocusSession::new("u1", Duration::from_secs(60));
        store.create(&session).await.unwrap();
        assert!(store.create(&session).await.is_err());

        session.rate(7);
        store.update(&session).await.unwrap();
        assert_eq!(store.get(session.id).await.unwrap().unwrap().quality, 7);

        assert!(store.delete(session.id).await.unwrap());
        assert!(!store.delete(session.id).await.unwrap());
        assert!(matches!(
            store.update(&session).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let store = InMemoryFocusStore::new();
        for user in ["a", "a", "b"] {
            store
                .create(&FocusSession::new(user, Duration::from_secs(60)))
                .await
                .unwrap();
        }
        let mut done = FocusSession::new("a", Duration::from_secs(60));
        done.finish(FocusStatus::Completed, attune_types::now());
        store.create(&done).await.unwrap();

        let a = store.list(&FocusFilter::new().for_user("a")).await.unwrap();
        assert_eq!(a.len(), 3);

        let completed = store
            .list(&FocusFilter::new().for_user("a").with_status(FocusStatus::Completed))
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, done.id);

        let limited = store.list(&FocusFilter::new().with_limit(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
    }
}
