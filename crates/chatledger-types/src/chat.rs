//! Session and message types for chatledger.
//!
//! A session is a bounded conversation between one user and one store.
//! Messages belong to exactly one session and are ordered by a per-session
//! sequence number assigned by the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Free-form key/value payload attached to sessions and messages.
///
/// Schema validation belongs to the business layer; persistence treats it
/// as an opaque JSON object.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Author of a message.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('user', 'assistant'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A chat session between a user and a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub store_id: String,
    pub user_id: String,
    pub metadata: Metadata,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A session is live when it is active, not soft-deleted, and not expired.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.deleted_at.is_none()
            && self.expires_at.is_none_or(|expires| expires > now)
    }

    pub fn is_live(&self) -> bool {
        self.is_live_at(Utc::now())
    }
}

/// Input for creating a session. The store assigns id and timestamps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSession {
    pub store_id: String,
    pub user_id: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewSession {
    pub fn new(store_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            user_id: user_id.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Lookup key for "resume-or-create" flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLookup {
    pub store_id: String,
    pub user_id: String,
}

/// A single persisted message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub token_count: Option<u32>,
    /// Response latency in milliseconds (assistant messages).
    pub response_time_ms: Option<u64>,
    /// Identifier of the matching run in the external trace sink.
    pub trace_id: Option<String>,
    /// Earlier message in the same session this one replies to.
    pub parent_message_id: Option<Uuid>,
    pub metadata: Metadata,
    /// Strictly increasing within a session, starting at 1.
    pub sequence_number: i64,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// Input for `save_message`. Id, sequence number and timestamp are assigned
/// by the store inside the write transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub token_count: Option<u32>,
    pub response_time_ms: Option<u64>,
    pub trace_id: Option<String>,
    pub parent_message_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewMessage {
    pub fn user(session_id: Uuid, content: impl Into<String>) -> Self {
        Self::with_role(session_id, MessageRole::User, content)
    }

    pub fn assistant(session_id: Uuid, content: impl Into<String>) -> Self {
        Self::with_role(session_id, MessageRole::Assistant, content)
    }

    fn with_role(session_id: Uuid, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            session_id,
            role,
            content: content.into(),
            token_count: None,
            response_time_ms: None,
            trace_id: None,
            parent_message_id: None,
            metadata: Metadata::new(),
        }
    }
}

/// A live session plus its most recent messages in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session: Session,
    pub recent_messages: Vec<Message>,
}

/// Token accounting reported by the model provider for one exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

/// One user/assistant exchange to be logged by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInteraction {
    pub session_id: Uuid,
    pub user_message: String,
    pub assistant_response: String,
    pub token_usage: Option<TokenUsage>,
    pub response_time_ms: Option<u64>,
    pub trace_id: Option<String>,
    pub business_metadata: Option<Metadata>,
}

impl ChatInteraction {
    pub fn new(
        session_id: Uuid,
        user_message: impl Into<String>,
        assistant_response: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            user_message: user_message.into(),
            assistant_response: assistant_response.into(),
            token_usage: None,
            response_time_ms: None,
            trace_id: None,
            business_metadata: None,
        }
    }
}

/// Ids of the message pair written by one logged interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_message_id: Uuid,
    pub assistant_message_id: Uuid,
}

/// A generated assistant reply that has been logged to its session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub content: String,
    pub record: InteractionRecord,
    pub response_time_ms: u64,
    pub token_usage: Option<TokenUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session() -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::now_v7(),
            store_id: "store_test".to_string(),
            user_id: "user_test".to_string(),
            metadata: Metadata::new(),
            is_active: true,
            created_at: now,
            last_active_at: now,
            expires_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_message_role_roundtrip() {
        for role in [MessageRole::User, MessageRole::Assistant] {
            let parsed: MessageRole = role.to_string().parse().unwrap();
            assert_eq!(role, parsed);
        }
        assert!("system".parse::<MessageRole>().is_err());
    }

    #[test]
    fn test_message_role_serde() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_session_liveness() {
        let now = Utc::now();
        let mut s = session();
        assert!(s.is_live_at(now));

        s.expires_at = Some(now - Duration::minutes(1));
        assert!(!s.is_live_at(now));

        s.expires_at = Some(now + Duration::hours(1));
        assert!(s.is_live_at(now));

        s.deleted_at = Some(now);
        assert!(!s.is_live_at(now));

        s.deleted_at = None;
        s.is_active = false;
        assert!(!s.is_live_at(now));
    }

    #[test]
    fn test_new_message_constructors() {
        let sid = Uuid::now_v7();
        let user = NewMessage::user(sid, "hi");
        assert_eq!(user.role, MessageRole::User);
        assert!(user.parent_message_id.is_none());

        let assistant = NewMessage::assistant(sid, "hello");
        assert_eq!(assistant.role, MessageRole::Assistant);
        assert_eq!(assistant.session_id, sid);
    }

    #[test]
    fn test_token_usage_skips_absent_fields() {
        let usage = TokenUsage {
            prompt_tokens: Some(12),
            ..Default::default()
        };
        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json, serde_json::json!({ "prompt_tokens": 12 }));
    }
}
