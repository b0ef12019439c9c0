use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::accommodations::AccommodationId;
use crate::workflows::accounts::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Account,
    Application,
    Lease,
    Invoice,
    Maintenance,
    Broadcast,
}

/// In-app inbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub subject: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub subject: String,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inbox {
    pub unread: usize,
    pub notifications: Vec<Notification>,
}

/// Who receives a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Audience {
    AllStudents,
    Accommodation { accommodation_id: AccommodationId },
    Selected { user_ids: Vec<UserId> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastRequest {
    pub subject: String,
    pub message: String,
    pub audience: Audience,
    #[serde(default)]
    pub send_sms: bool,
}

impl BroadcastRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.subject.trim().is_empty() {
            errors.push("Subject is required".to_string());
        }
        if self.message.trim().is_empty() {
            errors.push("Message is required".to_string());
        }
        if let Audience::Selected { user_ids } = &self.audience {
            if user_ids.is_empty() {
                errors.push("Please select at least one recipient".to_string());
            }
        }
        errors
    }

    /// SMS text: `"{subject}: {message}"` capped at 160 characters.
    pub fn sms_text(&self) -> String {
        format!("{}: {}", self.subject.trim(), self.message.trim())
            .chars()
            .take(SMS_MAX_CHARS)
            .collect()
    }
}

pub const SMS_MAX_CHARS: usize = 160;

/// Delivery counts reported back to the sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub sms_sent: usize,
    pub sms_failed: usize,
}
