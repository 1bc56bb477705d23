use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification category enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    /// Appointment created, confirmed or cancelled
    Appointment,
    /// Prescription issued or updated
    Prescription,
    /// System-generated notice
    System,
    /// Anything else
    Other,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Appointment => "appointment",
            NotificationCategory::Prescription => "prescription",
            NotificationCategory::System => "system",
            NotificationCategory::Other => "other",
        }
    }

    /// Parse a category from its stored string form.
    /// Unknown values map to `Other` rather than failing.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "appointment" => NotificationCategory::Appointment,
            "prescription" => NotificationCategory::Prescription,
            "system" => NotificationCategory::System,
            _ => NotificationCategory::Other,
        }
    }
}

/// Durable notification record.
///
/// Identifiers are assigned by the store at creation time and increase
/// monotonically, which gives clients a stable ordering and a resumption
/// marker for backlog fetches. The read flag only ever moves false -> true.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: i64,

    /// Recipient user identity (resolved by the directory service, opaque here)
    pub recipient_id: Uuid,

    pub category: NotificationCategory,

    pub title: String,

    pub body: String,

    pub is_read: bool,

    pub created_at: DateTime<Utc>,
}

/// Request to create (and fan out) a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    #[serde(default = "default_category")]
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
}

fn default_category() -> NotificationCategory {
    NotificationCategory::Other
}
