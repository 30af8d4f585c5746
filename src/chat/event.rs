//! Wire events carried in the chat stream.

use serde::{Deserialize, Serialize};

use crate::types::Citation;

/// One decoded chat stream event, discriminated by the `event` field.
///
/// Frames whose discriminator is not listed here fail to decode and are
/// skipped by the frame parser; the backend is free to add event types
/// without breaking older clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Retrieval context for the answer; replaces the citation list.
    Context {
        #[serde(default)]
        citations: Vec<Citation>,
    },
    /// An incremental text delta.
    Chunk { text: String },
    /// A progress update ("Searching code...", "Generating answer...").
    Status { message: String },
    /// A structured tool invocation result.
    ToolResult {
        #[serde(default)]
        name: Option<String>,
        result: serde_json::Value,
    },
    /// The backend failed mid-answer; terminal for the message.
    Error {
        #[serde(default)]
        message: Option<String>,
    },
}
