use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of a conversation message sent to a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A prior conversation turn passed to a provider as context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A completed command and what it did, kept for prompt enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    pub command: String,
    pub summary: String,
    pub at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(command: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            summary: summary.into(),
            at: Utc::now(),
        }
    }

    /// The user/assistant pair this interaction contributes to a prompt.
    pub fn to_messages(&self) -> [Message; 2] {
        [
            Message::user(self.command.clone()),
            Message::assistant(self.summary.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_to_messages() {
        let interaction = Interaction::new("make a red square", "created 1, updated 0, deleted 0, 0 failed");
        let [user, assistant] = interaction.to_messages();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "make a red square");
        assert_eq!(assistant.role, Role::Assistant);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
