//! Provider-agnostic model request types.

use serde::{Deserialize, Serialize};

use crate::chat::{Message, MessageRole};

/// Role of a turn sent to the model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

impl From<MessageRole> for TurnRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => TurnRole::User,
            MessageRole::Assistant => TurnRole::Assistant,
        }
    }
}

/// One turn of conversation history sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatTurn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.into(),
            content: message.content.clone(),
        }
    }
}

/// A completion plus whatever token accounting the provider reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub usage: Option<crate::chat::TokenUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_role_from_message_role() {
        assert_eq!(TurnRole::from(MessageRole::User), TurnRole::User);
        assert_eq!(TurnRole::from(MessageRole::Assistant), TurnRole::Assistant);
    }

    #[test]
    fn test_chat_turn_serialize() {
        let turn = ChatTurn::system("be brief");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "system", "content": "be brief" }));
    }
}
