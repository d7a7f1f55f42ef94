//! HTTP request handlers.

pub mod catalog;
mod chat;
mod health;

pub use chat::{chat, delete_session, get_session};
pub use health::{livez, readyz, version};
