use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Apology shown in place of an assistant reply when a send cycle fails.
pub const ERROR_REPLY: &str =
    "Sorry, I encountered an error. Please make sure the API is running and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
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

/// One entry of a transcript.
///
/// Messages are never edited after they are appended; the only mutation a
/// transcript sees is the removal of error replies when a retry starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant-role reply flagged as an error; carries the retry affordance.
    pub fn error_reply() -> Self {
        Self {
            is_error: true,
            ..Self::new(Role::Assistant, ERROR_REPLY)
        }
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }
}

/// True when at least one message in the transcript was written by the user.
pub fn has_user_message(messages: &[Message]) -> bool {
    messages.iter().any(Message::is_user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_as_lowercase_strings() {
        let message = Message::user("headache");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["isError"], false);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn missing_error_flag_defaults_to_false() {
        let json = r#"{"role":"assistant","content":"ok","timestamp":"2024-05-01T10:00:00Z"}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert!(message.is_assistant());
        assert!(!message.is_error);
    }

    #[test]
    fn invalid_role_strings_are_rejected() {
        assert!(Role::try_from("system").is_err());
        let json = r#"{"role":"tool","content":"x","timestamp":"2024-05-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());
    }

    #[test]
    fn error_reply_is_flagged_assistant_message() {
        let reply = Message::error_reply();
        assert!(reply.is_assistant());
        assert!(reply.is_error);
        assert_eq!(reply.content, ERROR_REPLY);
    }

    #[test]
    fn has_user_message_ignores_assistant_only_transcripts() {
        assert!(!has_user_message(&[]));
        assert!(!has_user_message(&[Message::assistant("hi")]));
        assert!(has_user_message(&[
            Message::assistant("hi"),
            Message::user("fever")
        ]));
    }
}
