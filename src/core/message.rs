use serde::{Deserialize, Serialize};

use crate::api::ChatTurn;
use crate::core::constants::PENDING_REPLY_TEXT;
use crate::utils::ids::{now_rfc3339, reply_id, unique_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    pub fn is_system(self) -> bool {
        self == Role::System
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: unique_id(),
            role,
            content: content.into(),
            created_at: now_rfc3339(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant message that will accumulate a streamed reply.
    pub fn reply_placeholder() -> Self {
        Self {
            id: reply_id(),
            ..Self::assistant(PENDING_REPLY_TEXT)
        }
    }

    pub fn to_turn(&self) -> ChatTurn {
        ChatTurn {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

/// Field replacements applied by [`crate::core::store::SessionStore::update_message`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub role: Option<Role>,
    pub content: Option<String>,
    pub created_at: Option<String>,
}

impl MessagePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, message: &mut ChatMessage) {
        if let Some(role) = self.role {
            message.role = role;
        }
        if let Some(content) = self.content {
            message.content = content;
        }
        if let Some(created_at) = self.created_at {
            message.created_at = created_at;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub agent_id: i64,
    /// Agent name when the session was created; later renames do not follow.
    pub agent_name: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn message(&self, message_id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|message| message.id == message_id)
    }

    pub(crate) fn message_mut(&mut self, message_id: &str) -> Option<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .find(|message| message.id == message_id)
    }

    /// History sent to the backend; system turns are injected server-side.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .filter(|message| !message.role.is_system())
            .map(ChatMessage::to_turn)
            .collect()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = now_rfc3339();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert!(json.contains(r#""role":"user""#));
    }

    #[test]
    fn invalid_role_strings_are_rejected() {
        assert!(Role::try_from("tool").is_err());
        let parsed: Result<ChatMessage, _> = serde_json::from_str(
            r#"{"id":"1","role":"robot","content":"","created_at":""}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn placeholder_starts_pending() {
        let placeholder = ChatMessage::reply_placeholder();
        assert!(placeholder.id.starts_with("reply-"));
        assert_eq!(placeholder.role, Role::Assistant);
        assert_eq!(placeholder.content, PENDING_REPLY_TEXT);
    }

    #[test]
    fn history_skips_system_messages() {
        let session = ChatSession {
            id: "s".into(),
            agent_id: 1,
            agent_name: "Bot".into(),
            title: "t".into(),
            created_at: String::new(),
            updated_at: String::new(),
            messages: vec![
                ChatMessage::new(Role::System, "be nice"),
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
            ],
        };
        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].content, "hello");
    }

    #[test]
    fn patch_replaces_only_given_fields() {
        let mut message = ChatMessage::assistant("old");
        let created = message.created_at.clone();
        MessagePatch::content("new").apply(&mut message);
        assert_eq!(message.content, "new");
        assert_eq!(message.created_at, created);
        assert_eq!(message.role, Role::Assistant);
    }
}
