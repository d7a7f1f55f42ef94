//! chatrelay - A small web chat back-end that relays conversations to
//! OpenAI-compatible chat-completion APIs.

pub mod catalog;
pub mod chat;
pub mod config;
pub mod handlers;
pub mod llm;
pub mod response;
pub mod server;
