//! LLM provider client for chat completions.

mod error;
mod openai;
mod provider;
mod registry;
mod types;

pub use error::{ErrorKind, LLMError};
pub use openai::{OpenAICompatibleProvider, completions_url};
pub use provider::LLMProvider;
pub use registry::ProviderRegistry;
pub use types::{ChatRequest, ChatResponse, Choice, Message, Role, Usage};
