//! In-app merchant notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shelfwise_core::{NotificationId, NotificationKind};

/// A notification shown once in the merchant's app.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub kind: NotificationKind,
    pub shown: bool,
    pub created_at: DateTime<Utc>,
}
