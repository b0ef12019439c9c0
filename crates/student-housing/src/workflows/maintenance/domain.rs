use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::accommodations::AccommodationId;
use crate::workflows::accounts::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaintenanceId(pub u64);

impl fmt::Display for MaintenanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Emergency => "emergency",
        }
    }

    /// Queue order: emergencies first.
    pub const fn urgency(self) -> u8 {
        match self {
            Priority::Emergency => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl MaintenanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MaintenanceStatus::Pending => "pending",
            MaintenanceStatus::InProgress => "in progress",
            MaintenanceStatus::Completed => "completed",
            MaintenanceStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, MaintenanceStatus::Completed | MaintenanceStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub id: MaintenanceId,
    pub user_id: UserId,
    pub accommodation_id: AccommodationId,
    pub issue: String,
    pub description: String,
    pub priority: Priority,
    pub status: MaintenanceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl MaintenanceRequest {
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMaintenanceRequest {
    pub user_id: UserId,
    pub accommodation_id: AccommodationId,
    pub issue: String,
    pub description: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceSubmission {
    pub accommodation_id: AccommodationId,
    pub issue: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
}

impl MaintenanceSubmission {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.issue.trim().is_empty() {
            errors.push("Issue is required".to_string());
        }
        if self.description.trim().is_empty() {
            errors.push("Description is required".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: MaintenanceStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Applied by [`super::MaintenanceRepository::update_maintenance_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: MaintenanceStatus,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceFilter {
    #[serde(default)]
    pub status: Option<MaintenanceStatus>,
}

/// Most urgent first, newest first within a priority.
pub fn sort_queue(requests: &mut [MaintenanceRequest]) {
    requests.sort_by(|a, b| {
        a.priority
            .urgency()
            .cmp(&b.priority.urgency())
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
