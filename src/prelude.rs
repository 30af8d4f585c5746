//! Convenience re-exports for common use.

pub use crate::chat::{ChatRequest, ChatSession, ChatTransport, EventStream, StreamEvent};
pub use crate::client::BackendClient;
pub use crate::config::ClientConfig;
pub use crate::error::{ClientError, Result};
pub use crate::types::{
    ChatMessage, ChatRole, Citation, ConnectedRepo, DocumentMeta, GithubRepo, Installation,
    IngestionJob, IngestionTask, JobStatus, Organization, PresignedUrl, TaskStatus, WikiPage,
};
