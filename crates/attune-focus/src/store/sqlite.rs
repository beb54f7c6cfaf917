//! SQLite history store.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use attune_types::{FocusSession, FocusSessionId, FocusStatus, Timestamp};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, Row, params};
use tracing::{debug, info};

use super::{FocusFilter, FocusStore, StoreError, StoreResult};

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 2;

const COLUMNS: &str = "id, user_id, vendor_id, status, quality, duration_ms, \
                       started_at, ended_at, created_at, updated_at";

/// History store backed by SQLite.
///
/// Queries are short and run inline on the calling task.
pub struct SqliteFocusStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteFocusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteFocusStore").finish_non_exhaustive()
    }
}

impl SqliteFocusStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|_| StoreError::Database(rusqlite::Error::InvalidPath(path.to_path_buf())))?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;

        info!(path = %path.display(), "Focus store opened");
        Ok(store)
    }

    /// Create an in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.migrate()?;
        debug!("In-memory focus store created");
        Ok(store)
    }

    fn migrate(&self) -> StoreResult<()> {
        let conn = self.conn.lock();
        let current: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if current >= SCHEMA_VERSION {
            debug!(version = current, "Focus schema up to date");
            return Ok(());
        }

        info!(from = current, to = SCHEMA_VERSION, "Migrating focus schema");

        if current < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS focus_sessions (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    vendor_id TEXT NOT NULL DEFAULT '',
                    status TEXT NOT NULL,
                    duration_ms INTEGER NOT NULL,
                    started_at TEXT NOT NULL,
                    ended_at TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_focus_sessions_user
                    ON focus_sessions(user_id, started_at);
                "#,
            )?;
        }

        if current < 2 {
            Self::migrate_v2(&conn)?;
        }

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// Migration v2: self-rated quality.
    fn migrate_v2(conn: &Connection) -> StoreResult<()> {
        let has_column = conn
            .prepare("SELECT quality FROM focus_sessions LIMIT 0")
            .is_ok();
        if !has_column {
            conn.execute_batch(
                "ALTER TABLE focus_sessions ADD COLUMN quality INTEGER NOT NULL DEFAULT 0;",
            )?;
        }
        Ok(())
    }

    fn row_to_session(row: &Row<'_>) -> StoreResult<FocusSession> {
        let id: String = row.get(0)?;
        let status: String = row.get(3)?;
        let quality: i64 = row.get(4)?;
        let duration_ms: i64 = row.get(5)?;
        let ended_at: Option<String> = row.get(7)?;

        Ok(FocusSession {
            id: id
                .parse()
                .map_err(|e| StoreError::InvalidData(format!("session id '{id}': {e}")))?,
            user_id: row.get(1)?,
            vendor_id: row.get(2)?,
            status: status.parse().map_err(StoreError::InvalidData)?,
            quality: u8::try_from(quality)
                .map_err(|_| StoreError::InvalidData(format!("quality out of range: {quality}")))?,
            duration: Duration::from_millis(u64::try_from(duration_ms).map_err(|_| {
                StoreError::InvalidData(format!("negative duration: {duration_ms}"))
            })?),
            started_at: parse_timestamp(&row.get::<_, String>(6)?)?,
            ended_at: ended_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&row.get::<_, String>(8)?)?,
            updated_at: parse_timestamp(&row.get::<_, String>(9)?)?,
        })
    }
}

// Fixed-width so text ordering matches time ordering.
fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(s: &str) -> StoreResult<Timestamp> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("timestamp '{s}': {e}")))
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl FocusStore for SqliteFocusStore {
    async fn create(&self, session: &FocusSession) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            &format!("INSERT INTO focus_sessions ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                session.id.to_string(),
                session.user_id,
                session.vendor_id,
                session.status.as_str(),
                session.quality,
                duration_ms(session.duration),
                format_timestamp(&session.started_at),
                session.ended_at.as_ref().map(format_timestamp),
                format_timestamp(&session.created_at),
                format_timestamp(&session.updated_at),
            ],
        )?;
        debug!(session_id = %session.id, user_id = %session.user_id, "Focus session inserted");
        Ok(())
    }

    async fn get(&self, id: FocusSessionId) -> StoreResult<Option<FocusSession>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM focus_sessions WHERE id = ?1"))?;
        let mut rows = stmt.query(params![id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_session(row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &FocusFilter) -> StoreResult<Vec<FocusSession>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {COLUMNS} FROM focus_sessions
            WHERE (?1 IS NULL OR user_id = ?1)
              AND (?2 IS NULL OR status = ?2)
            ORDER BY started_at DESC
            LIMIT ?3
            "#
        ))?;

        // SQLite treats a negative LIMIT as unbounded.
        let limit = filter
            .limit
            .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let mut rows = stmt.query(params![
            filter.user_id,
            filter.status.map(FocusStatus::as_str),
            limit
        ])?;

        let mut sessions = Vec::new();
        while let Some(row) = rows.next()? {
            sessions.push(Self::row_to_session(row)?);
        }
        Ok(sessions)
    }

    async fn update(&self, session: &FocusSession) -> StoreResult<()> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute(
            r#"
            UPDATE focus_sessions
            SET vendor_id = ?2, status = ?3, quality = ?4, duration_ms = ?5,
                ended_at = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                session.id.to_string(),
                session.vendor_id,
                session.status.as_str(),
                session.quality,
                duration_ms(session.duration),
                session.ended_at.as_ref().map(format_timestamp),
                format_timestamp(&session.updated_at),
            ],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("focus session {}", session.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: FocusSessionId) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute(
            "DELETE FROM focus_sessions WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(rows_affected > 0)
    }
}

impl SqliteFocusStore {
    /// Schema version recorded in the database.
    pub fn schema_version(&self) -> StoreResult<i32> {
        let conn = self.conn.lock();
        Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attune_types::now;

    #[tokio::test]
    async fn test_roundtrip_preserves_fields() {
        let store = SqliteFocusStore::open_in_memory().unwrap();
        let mut session =
            FocusSession::new("u1", Duration::from_millis(1500)).with_vendor_id("chat-42");
        store.create(&session).await.unwrap();

        session.finish(FocusStatus::Stopped, now());
        session.rate(4);
        store.update(&session).await.unwrap();

        let loaded = store.get(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, FocusStatus::Stopped);
        assert_eq!(loaded.quality, 4);
        assert_eq!(loaded.vendor_id, "chat-42");
        assert_eq!(loaded.duration, Duration::from_millis(1500));
        assert_eq!(loaded.ended_at, session.ended_at);
        assert_eq!(loaded.started_at, session.started_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = SqliteFocusStore::open_in_memory().unwrap();
        let session = FocusSession::new("u1", Duration::from_secs(60));
        assert!(matches!(
            store.update(&session).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.get(session.id).await.unwrap().is_none());
        assert!(!store.delete(session.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filters() {
        let store = SqliteFocusStore::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for i in 0..3 {
            let mut session = FocusSession::new("u1", Duration::from_secs(60));
            session.started_at += chrono::Duration::seconds(i);
            store.create(&session).await.unwrap();
            ids.push(session.id);
        }
        store
            .create(&FocusSession::new("u2", Duration::from_secs(60)))
            .await
            .unwrap();

        let listed = store.list(&FocusFilter::new().for_user("u1")).await.unwrap();
        assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), vec![ids[2], ids[1], ids[0]]);

        let limited = store
            .list(&FocusFilter::new().for_user("u1").with_limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        let active = store
            .list(&FocusFilter::new().with_status(FocusStatus::Active))
            .await
            .unwrap();
        assert_eq!(active.len(), 4);
        assert!(store
            .list(&FocusFilter::new().with_status(FocusStatus::Completed))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_reopen_keeps_data_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("attune.db");
        let session = FocusSession::new("u1", Duration::from_secs(60));

        {
            let store = SqliteFocusStore::open(&path).unwrap();
            store.create(&session).await.unwrap();
            assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        }

        let store = SqliteFocusStore::open(&path).unwrap();
        assert!(store.get(session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_v1_database_gains_quality_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE focus_sessions (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    vendor_id TEXT NOT NULL DEFAULT '',
                    status TEXT NOT NULL,
                    duration_ms INTEGER NOT NULL,
                    started_at TEXT NOT NULL,
                    ended_at TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                PRAGMA user_version = 1;
                "#,
            )
            .unwrap();
        }

        let store = SqliteFocusStore::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        let session = FocusSession::new("u1", Duration::from_secs(60));
        store.create(&session).await.unwrap();
        assert_eq!(store.get(session.id).await.unwrap().unwrap().quality, 0);
    }
}
