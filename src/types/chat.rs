//! Conversation state types for the streaming chat.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A retrieval citation attached to an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Similarity score in [0, 1]; the backend has sent this under both names.
    #[serde(default, alias = "similarity", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// A structured tool invocation result surfaced mid-stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResultRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub result: serde_json::Value,
}

/// One message in the conversation transcript.
///
/// For an in-flight assistant message, `content` grows by concatenation as
/// `chunk` events arrive; `citations`, `status_log`, and `tool_results`
/// are folded in by the reducer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    /// Deduplicated progress log, capped to the most recent entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_log: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResultRecord>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content: content.into(),
            citations: Vec::new(),
            status_log: Vec::new(),
            current_status: None,
            tool_results: Vec::new(),
            is_error: false,
        }
    }

    /// Create an empty assistant message to stream into.
    pub fn assistant_open() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            content: String::new(),
            citations: Vec::new(),
            status_log: Vec::new(),
            current_status: None,
            tool_results: Vec::new(),
            is_error: false,
        }
    }

    /// Replace the content with a terminal failure notice.
    pub fn fail(&mut self, notice: impl Into<String>) {
        self.content = notice.into();
        self.current_status = None;
        self.is_error = true;
    }
}

/// A prior turn forwarded to the backend as chat history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryTurn {
    pub role: ChatRole,
    pub content: String,
}

impl From<&ChatMessage> for HistoryTurn {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_accepts_similarity_alias() {
        let json = r#"{"file_path": "src/lib.rs", "similarity": 0.87}"#;
        let citation: Citation = serde_json::from_str(json).unwrap();
        assert_eq!(citation.score, Some(0.87));
    }

    #[test]
    fn fail_replaces_content_and_flags_error() {
        let mut msg = ChatMessage::assistant_open();
        msg.content = "partial answ".to_string();
        msg.current_status = Some("Searching...".to_string());

        msg.fail("Something went wrong.");

        assert_eq!(msg.content, "Something went wrong.");
        assert!(msg.is_error);
        assert!(msg.current_status.is_none());
    }

    #[test]
    fn serialized_open_message_omits_empty_fields() {
        let msg = ChatMessage::assistant_open();
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("citations").is_none());
        assert!(json.get("is_error").is_none());
    }
}
