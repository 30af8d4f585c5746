//! Shared test helpers: a scripted chat transport.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use repowiki::chat::{ChatRequest, ChatTransport, EventStream};
use repowiki::error::{ClientError, Result};

/// One step of a scripted stream body.
pub enum ScriptItem {
    /// Emit raw bytes.
    Bytes(String),
    /// Sleep before the next item.
    Delay(Duration),
    /// Yield a transport error and end the stream.
    Error(ClientError),
    /// Never produce anything again (for cancellation/timeout tests).
    Pending,
}

/// Wrap a JSON payload as a `data:` frame.
pub fn frame(json: &str) -> ScriptItem {
    ScriptItem::Bytes(format!("data: {json}\n\n"))
}

pub fn chunk_frame(text: &str) -> ScriptItem {
    frame(&format!(r#"{{"event":"chunk","text":"{text}"}}"#))
}

pub fn status_frame(message: &str) -> ScriptItem {
    frame(&format!(r#"{{"event":"status","message":"{message}"}}"#))
}

pub fn error_frame() -> ScriptItem {
    frame(r#"{"event":"error","message":"backend fell over"}"#)
}

/// A transport that replays scripted stream bodies and records requests.
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Result<Vec<ScriptItem>>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a stream body for the next `open_chat` call.
    pub fn queue_stream(&self, items: Vec<ScriptItem>) {
        self.scripts.lock().unwrap().push_back(Ok(items));
    }

    /// Queue an open failure for the next `open_chat` call.
    pub fn queue_open_error(&self, error: ClientError) {
        self.scripts.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open_chat(&self, request: &ChatRequest) -> Result<EventStream> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Vec::new()))?;
        Ok(EventStream::new(scripted_stream(script)))
    }
}

fn scripted_stream(
    items: Vec<ScriptItem>,
) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
    async_stream::stream! {
        for item in items {
            match item {
                ScriptItem::Bytes(s) => yield Ok(Bytes::from(s)),
                ScriptItem::Delay(d) => tokio::time::sleep(d).await,
                ScriptItem::Error(e) => {
                    yield Err(e);
                    return;
                }
                ScriptItem::Pending => futures::future::pending::<()>().await,
            }
        }
    }
}
