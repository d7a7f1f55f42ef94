//! Conversation handling and the completion client.

mod client;
mod conversation;
mod store;

pub use client::{CompletionClient, CompletionError, DEFAULT_SYSTEM_PROMPT, RetryPolicy};
pub use conversation::Conversation;
pub use store::{ConversationStore, DEFAULT_SESSION_TTL};

pub use crate::llm::ErrorKind;
