//! Focus session history records.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Timestamp, now};

/// Highest accepted self-rated session quality.
pub const MAX_QUALITY: u8 = 10;

/// Identifier of a focus session history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FocusSessionId(Uuid);

impl FocusSessionId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FocusSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FocusSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FocusSessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle status of a focus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusStatus {
    Active,
    Completed,
    Stopped,
}

impl FocusStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        !matches!(self, FocusStatus::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FocusStatus::Active => "active",
            FocusStatus::Completed => "completed",
            FocusStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for FocusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FocusStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(FocusStatus::Active),
            "completed" => Ok(FocusStatus::Completed),
            "stopped" => Ok(FocusStatus::Stopped),
            other => Err(format!("unknown focus status: {other}")),
        }
    }
}

/// A focus session as kept in the history store.
///
/// The live timer state lives in the lifecycle manager; this record is the
/// audit trail written when a session starts and updated when it ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: FocusSessionId,
    pub user_id: String,
    /// Notification address; empty means the user is never notified.
    #[serde(default)]
    pub vendor_id: String,
    pub status: FocusStatus,
    /// Self-rated quality, `0..=MAX_QUALITY`. Zero until rated.
    #[serde(default)]
    pub quality: u8,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub started_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ended_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FocusSession {
    /// Create a new active session record starting now.
    pub fn new(user_id: impl Into<String>, duration: Duration) -> Self {
        let ts = now();
        Self {
            id: FocusSessionId::new(),
            user_id: user_id.into(),
            vendor_id: String::new(),
            status: FocusStatus::Active,
            quality: 0,
            duration,
            started_at: ts,
            ended_at: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    /// Set the notification address.
    pub fn with_vendor_id(mut self, vendor_id: impl Into<String>) -> Self {
        self.vendor_id = vendor_id.into();
        self
    }

    /// Record the terminal status of the session.
    pub fn finish(&mut self, status: FocusStatus, ended_at: Timestamp) {
        self.status = status;
        self.ended_at = Some(ended_at);
        self.updated_at = now();
    }

    /// Set the self-rated quality. Returns `false` if out of range.
    pub fn rate(&mut self, quality: u8) -> bool {
        if quality > MAX_QUALITY {
            return false;
        }
        self.quality = quality;
        self.updated_at = now();
        true
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
