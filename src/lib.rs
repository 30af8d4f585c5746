//! repowiki — async client for a repository documentation & chat backend.
//!
//! Wraps the backend's REST contract (organizations, GitHub App
//! installations, repository connection, ingestion jobs, documents, wikis)
//! and its streaming chat endpoint, including the event parser and the
//! conversation reducer that folds streamed events into messages.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use repowiki::client::BackendClient;
//! use repowiki::chat::ChatSession;
//!
//! # async fn example() -> repowiki::error::Result<()> {
//! let client = BackendClient::new("https://api.example.com", "bearer-token");
//! let orgs = client.list_organizations().await?;
//!
//! let session = ChatSession::new(Arc::new(client));
//! let message_id = session.send("How does ingestion work?").await?;
//! let answer = session.message(message_id).unwrap();
//! println!("{}", answer.content);
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod ingest;
pub mod prelude;
pub mod types;
pub mod util;
