//! Streaming chat: wire events, frame parsing, conversation folding.

pub mod event;
pub mod reducer;
pub mod session;
pub mod sse;

pub use event::StreamEvent;
pub use reducer::{apply_event, STATUS_LOG_CAP};
pub use session::{ChatRequest, ChatSession, ChatTransport, FAILURE_NOTICE, TIMEOUT_NOTICE};
pub use sse::EventStream;
