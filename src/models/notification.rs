use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::enums::{NotificationCategory, NotificationIcon};

/// Identifier of a notification within its backing collection.
pub type NotificationId = i64;

/// Notification as returned by a fetch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Whether the local read flag has been confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ReadSync {
    Synced,
    /// Marked read locally, remote mutation not resolved yet.
    InFlight,
    /// Marked read locally, remote mutation failed.
    PendingRetry(String),
}

/// A notification with its derived fields, computed once at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub id: NotificationId,
    pub message: String,
    pub read: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub category: NotificationCategory,
    /// Digits of the embedded `(ID: n)` marker, empty when absent.
    pub ref_id: String,
    pub display_text: String,
    pub icon: NotificationIcon,
    pub link: Option<String>,
    pub sync: ReadSync,
}

impl NotificationItem {
    pub fn is_pending_retry(&self) -> bool {
        matches!(self.sync, ReadSync::PendingRetry(_))
    }
}

/// Accepts RFC 3339 or a naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as UTC).
/// Anything else becomes `None` rather than failing the whole list.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
