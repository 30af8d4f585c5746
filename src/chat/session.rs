//! Conversation session: one in-flight stream, cancellation, timeout, retry.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::types::{ChatMessage, ChatRole, HistoryTurn};

use super::reducer::apply_event;
use super::sse::EventStream;

/// Substituted content when the stream fails mid-answer.
pub const FAILURE_NOTICE: &str =
    "Sorry, something went wrong while answering. Please try again.";

/// Substituted content when the stream exceeds the client-side deadline.
pub const TIMEOUT_NOTICE: &str = "The response timed out. Please try again.";

const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Body posted to the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_ids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryTurn>,
}

/// Seam between the session and the wire.
///
/// The production impl is `BackendClient` (POST `/chat/stream`); tests fold
/// canned byte streams through the same path.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open_chat(&self, request: &ChatRequest) -> Result<EventStream>;
}

struct SessionState {
    messages: Mutex<Vec<ChatMessage>>,
    in_flight: Mutex<Option<CancellationToken>>,
    last_query: Mutex<Option<String>>,
}

/// A chat conversation over the connected repositories.
///
/// Holds the transcript in memory for the lifetime of the session; exactly
/// one assistant message is open per in-flight request, and a new `send`
/// aborts the previous one. Cloned handles share the same transcript.
#[derive(Clone)]
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    state: Arc<SessionState>,
    stream_timeout: Duration,
    repo_ids: Option<Vec<i64>>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            state: Arc::new(SessionState {
                messages: Mutex::new(Vec::new()),
                in_flight: Mutex::new(None),
                last_query: Mutex::new(None),
            }),
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            repo_ids: None,
        }
    }

    /// Override the whole-stream deadline (default 30 s).
    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Restrict answers to specific connected repositories.
    pub fn with_repo_ids(mut self, repo_ids: Vec<i64>) -> Self {
        self.repo_ids = Some(repo_ids);
        self
    }

    /// Snapshot of the transcript.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.messages.lock().unwrap().clone()
    }

    /// Look up one message by id.
    pub fn message(&self, id: Uuid) -> Option<ChatMessage> {
        self.state
            .messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    /// Abort the in-flight stream, if any. The open message keeps whatever
    /// content it had accumulated; this is not an error state.
    pub fn cancel(&self) {
        if let Some(token) = self.state.in_flight.lock().unwrap().take() {
            token.cancel();
        }
    }

    /// Send a user query and fold the streamed answer into the transcript.
    ///
    /// Returns the id of the assistant message. Mid-stream failures and
    /// timeouts are recorded on the message (`is_error`), not returned as
    /// errors; only a failure to open the stream (e.g. auth rejection)
    /// surfaces as `Err`. Cancellation by a newer `send` returns `Ok` with
    /// the message left exactly as it was.
    pub async fn send(&self, query: &str) -> Result<Uuid> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::InvalidArgument("empty query".into()));
        }

        let request = ChatRequest {
            query: query.to_string(),
            repo_ids: self.repo_ids.clone(),
            history: self.history(),
        };

        let assistant_id = {
            let mut messages = self.state.messages.lock().unwrap();
            messages.push(ChatMessage::user(query));
            let open = ChatMessage::assistant_open();
            let id = open.id;
            messages.push(open);
            id
        };
        *self.state.last_query.lock().unwrap() = Some(query.to_string());

        // A new send aborts the previous in-flight stream.
        let token = CancellationToken::new();
        if let Some(previous) = self
            .state
            .in_flight
            .lock()
            .unwrap()
            .replace(token.clone())
        {
            previous.cancel();
        }

        let outcome = self.run_stream(&request, assistant_id, &token).await;

        // Clear the slot only if it is still ours. Anything that replaced
        // or removed our token also cancelled it, so an uncancelled token
        // means the slot still holds it.
        {
            let mut in_flight = self.state.in_flight.lock().unwrap();
            if !token.is_cancelled() {
                *in_flight = None;
            }
        }

        match outcome {
            Ok(()) => Ok(assistant_id),
            Err(e) if e.is_cancelled() => {
                tracing::debug!(message_id = %assistant_id, "Chat stream cancelled");
                Ok(assistant_id)
            }
            Err(e) => {
                // Opening the stream failed outright: drop the empty open
                // message (the original UI did the same) and surface it.
                let mut messages = self.state.messages.lock().unwrap();
                if messages
                    .last()
                    .is_some_and(|m| m.id == assistant_id && m.content.is_empty())
                {
                    messages.pop();
                }
                Err(e)
            }
        }
    }

    /// Re-issue the most recent user query after a failed answer.
    ///
    /// Drops the failed assistant message and its user turn before sending,
    /// so the transcript does not grow duplicate turns.
    pub async fn retry(&self) -> Result<Uuid> {
        let query = self
            .state
            .last_query
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ClientError::InvalidState("nothing to retry".into()))?;

        {
            let mut messages = self.state.messages.lock().unwrap();
            if messages
                .last()
                .is_some_and(|m| m.role == ChatRole::Assistant)
            {
                messages.pop();
            }
            if messages
                .last()
                .is_some_and(|m| m.role == ChatRole::User && m.content == query)
            {
                messages.pop();
            }
        }

        self.send(&query).await
    }

    /// Prior completed turns, oldest first, as forwarded to the backend.
    fn history(&self) -> Vec<HistoryTurn> {
        self.state
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| !m.is_error && !m.content.is_empty())
            .map(HistoryTurn::from)
            .collect()
    }

    /// Open the stream and fold events until EOF, deadline, cancel, or error.
    ///
    /// Returns `Err(Cancelled)` on abort; all other stream-phase failures
    /// are folded into the message and reported as `Ok`.
    async fn run_stream(
        &self,
        request: &ChatRequest,
        assistant_id: Uuid,
        token: &CancellationToken,
    ) -> Result<()> {
        let deadline = tokio::time::sleep(self.stream_timeout);
        tokio::pin!(deadline);

        let mut events = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ClientError::Cancelled),
            opened = self.transport.open_chat(request) => opened?,
            _ = &mut deadline => {
                self.fail_message(assistant_id, TIMEOUT_NOTICE);
                return Ok(());
            }
        };

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ClientError::Cancelled),
                _ = &mut deadline => {
                    self.fail_message(assistant_id, TIMEOUT_NOTICE);
                    return Ok(());
                }
                next = events.next() => match next {
                    None => break,
                    Some(Ok(event)) => {
                        let mut messages = self.state.messages.lock().unwrap();
                        if let Some(msg) = messages.iter_mut().find(|m| m.id == assistant_id) {
                            apply_event(msg, event);
                        }
                    }
                    Some(Err(e)) if e.is_cancelled() => return Err(e),
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Chat stream failed mid-answer");
                        self.fail_message(assistant_id, FAILURE_NOTICE);
                        return Ok(());
                    }
                },
            }
        }

        let skipped = events.skipped_frames();
        if skipped > 0 {
            tracing::debug!(skipped, "Chat stream contained undecodable frames");
        }
        Ok(())
    }

    fn fail_message(&self, id: Uuid, notice: &str) {
        let mut messages = self.state.messages.lock().unwrap();
        if let Some(msg) = messages.iter_mut().find(|m| m.id == id) {
            msg.fail(notice);
        }
    }
}
