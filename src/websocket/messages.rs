/// Wire message types for the WebSocket surface
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Notification, NotificationCategory};
use crate::registry::SessionId;

/// Events a client may send
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this session to a user identity (verified upstream)
    Join { user_id: Uuid },

    /// Relay an opaque payload to every live session of another user
    Signal {
        to: Uuid,
        data: serde_json::Value,
    },
}

/// Events the server pushes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Association acknowledged
    Joined {
        user_id: Uuid,
        session_id: SessionId,
    },

    /// Full durable notification record, identifier included so the client
    /// can deduplicate against the pulled backlog
    Notification {
        id: i64,
        recipient_id: Uuid,
        category: NotificationCategory,
        title: String,
        body: String,
        is_read: bool,
        created_at: i64,
    },

    /// Relayed signaling payload
    Signal {
        from: SessionId,
        data: serde_json::Value,
    },

    /// Error surfaced to this session only
    Error { code: String, message: String },
}

impl ServerEvent {
    pub fn joined(user_id: Uuid, session_id: SessionId) -> Self {
        ServerEvent::Joined {
            user_id,
            session_id,
        }
    }

    pub fn notification(record: &Notification) -> Self {
        ServerEvent::Notification {
            id: record.id,
            recipient_id: record.recipient_id,
            category: record.category,
            title: record.title.clone(),
            body: record.body.clone(),
            is_read: record.is_read,
            created_at: record.created_at.timestamp(),
        }
    }

    pub fn signal(from: SessionId, data: serde_json::Value) -> Self {
        ServerEvent::Signal { from, data }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientEvent {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_join_event_parses() {
        let user_id = Uuid::new_v4();
        let json = format!(r#"{{"type":"join","user_id":"{user_id}"}}"#);
        let event = ClientEvent::from_json(&json).unwrap();
        assert_eq!(event, ClientEvent::Join { user_id });
    }

    #[test]
    fn test_signal_event_parses_opaque_payload() {
        let to = Uuid::new_v4();
        let json = format!(r#"{{"type":"signal","to":"{to}","data":{{"sdp":"offer"}}}}"#);
        let event = ClientEvent::from_json(&json).unwrap();
        match event {
            ClientEvent::Signal { to: target, data } => {
                assert_eq!(target, to);
                assert_eq!(data["sdp"], "offer");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_notification_event_carries_identifier() {
        let record = Notification {
            id: 42,
            recipient_id: Uuid::new_v4(),
            category: NotificationCategory::Prescription,
            title: "New prescription".to_string(),
            body: "Ready for pickup".to_string(),
            is_read: false,
            created_at: Utc::now(),
        };

        let json = ServerEvent::notification(&record).to_json().unwrap();
        assert!(json.contains(r#""type":"notification""#));
        assert!(json.contains(r#""id":42"#));
        assert!(json.contains(r#""category":"prescription""#));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(ClientEvent::from_json(r#"{"type":"subscribe"}"#).is_err());
        assert!(ClientEvent::from_json("not json").is_err());
    }
}
