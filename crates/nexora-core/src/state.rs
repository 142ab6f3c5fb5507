//! UI-agnostic conversation types
//!
//! These live only in memory for the lifetime of a session. Nothing here is
//! persisted.

use serde::{Deserialize, Serialize};

use crate::data_uri::ImageDataUri;

/// A message in the chat transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub image: Option<ImageDataUri>,
    /// Inline error notices are shown in the transcript but never sent back
    /// to the model as history.
    pub is_error: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, image: Option<ImageDataUri>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            image,
            is_error: false,
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Bot,
            content: content.into(),
            image: None,
            is_error: false,
        }
    }

    pub fn bot_error(message: impl AsRef<str>) -> Self {
        Self {
            role: ChatRole::Bot,
            content: format!("Error: {}", message.as_ref()),
            image: None,
            is_error: true,
        }
    }

    pub fn to_history(&self) -> HistoryTurn {
        HistoryTurn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Who sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

/// One prior turn handed to the reasoning flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: ChatRole,
    pub content: String,
}

impl HistoryTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Bot, content: content.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_roles_serialize_lowercase() {
        let json = serde_json::to_string(&HistoryTurn::user("Hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Hi"}"#);
        let turn: HistoryTurn = serde_json::from_str(r#"{"role":"bot","content":"Hello"}"#).unwrap();
        assert_eq!(turn, HistoryTurn::bot("Hello"));
    }

    #[test]
    fn bot_error_is_flagged() {
        let msg = ChatMessage::bot_error("boom");
        assert!(msg.is_error);
        assert_eq!(msg.content, "Error: boom");
    }
}
