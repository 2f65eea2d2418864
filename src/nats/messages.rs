use serde::{Deserialize, Serialize};

use crate::observer::SessionNotification;

/// Session notification published to NATS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub session_id: String,
    /// Increases by one for every message of a session
    pub sequence: u64,
    pub timestamp: String,  // RFC3339 timestamp
    pub notification: SessionNotification,
}

/// Subject a session's notifications are published on
pub fn notification_subject(session_id: &str, kind: &str) -> String {
    format!("voice.session.{}.{}", session_id, kind)
}

/// Wildcard subject matching every notification of a session
pub fn session_wildcard(session_id: &str) -> String {
    format!("voice.session.{}.>", session_id)
}
