//! Core types for the backend contract and chat conversation state.

pub mod api;
pub mod chat;

pub use api::*;
pub use chat::*;
