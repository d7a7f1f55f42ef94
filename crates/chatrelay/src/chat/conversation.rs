//! Ordered conversation history.

use serde::{Deserialize, Serialize};

use crate::llm::{Message, Role};

/// An ordered list of chat turns.
///
/// The first message, when present, is kept as the system prompt by
/// [`Conversation::ensure_system_prompt`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prompt` as a system message unless one already leads.
    ///
    /// Returns whether a message was inserted.
    pub fn ensure_system_prompt(&mut self, prompt: &str) -> bool {
        if self.messages.first().is_some_and(|m| m.role == Role::System) {
            return false;
        }
        self.messages.insert(0, Message::system(prompt));
        true
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Drop trailing messages so that only `len` remain.
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl From<Conversation> for Vec<Message> {
    fn from(conversation: Conversation) -> Self {
        conversation.messages
    }
}
