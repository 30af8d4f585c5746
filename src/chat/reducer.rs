//! Folding stream events into the open assistant message.

use crate::types::{ChatMessage, ToolResultRecord};

use super::event::StreamEvent;

/// Maximum retained status-log entries; oldest are evicted first.
pub const STATUS_LOG_CAP: usize = 15;

/// Apply one decoded event to the message being streamed into.
///
/// An `error` event is terminal: the error state latches and every
/// subsequent event for this message is dropped.
pub fn apply_event(message: &mut ChatMessage, event: StreamEvent) {
    if message.is_error {
        return;
    }

    match event {
        StreamEvent::Context { citations } => {
            message.citations = citations;
        }
        StreamEvent::Chunk { text } => {
            message.content.push_str(&text);
        }
        StreamEvent::Status { message: status } => {
            if message.status_log.last() != Some(&status) {
                message.status_log.push(status.clone());
                if message.status_log.len() > STATUS_LOG_CAP {
                    let overflow = message.status_log.len() - STATUS_LOG_CAP;
                    message.status_log.drain(..overflow);
                }
            }
            message.current_status = Some(status);
        }
        StreamEvent::ToolResult { name, result } => {
            message.tool_results.push(ToolResultRecord { name, result });
        }
        StreamEvent::Error { message: reason } => {
            message.is_error = true;
            message.current_status = None;
            if message.content.is_empty() {
                message.content = reason.unwrap_or_else(|| "The backend reported an error.".into());
            }
        }
    }
}
