//! Provider registry for resolving endpoints to LLM provider instances.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tracing::debug;

use super::openai::{OpenAICompatibleProvider, completions_url};
use super::provider::LLMProvider;

/// Resolves a base URL and credential to a provider.
///
/// Providers registered explicitly take precedence for their endpoint.
/// Any other endpoint gets an OpenAI-compatible provider sharing one
/// HTTP client.
#[derive(Clone)]
pub struct ProviderRegistry {
    client: Client,
    registered: HashMap<String, Arc<dyn LLMProvider>>,
}

impl ProviderRegistry {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            registered: HashMap::new(),
        }
    }

    /// Register a provider implementation for an endpoint.
    pub fn register(&mut self, base_url: &str, implementation: Arc<dyn LLMProvider>) {
        self.registered
            .insert(completions_url(base_url), implementation);
    }

    /// Get the provider serving `base_url`.
    pub fn get(&self, base_url: &str, api_key: Option<String>) -> Arc<dyn LLMProvider> {
        let endpoint = completions_url(base_url);
        if let Some(provider) = self.registered.get(&endpoint) {
            return provider.clone();
        }
        debug!(endpoint = %endpoint, "Using OpenAI-compatible provider");
        Arc::new(OpenAICompatibleProvider::new(
            self.client.clone(),
            &endpoint,
            api_key,
        ))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::llm::{ChatRequest, ChatResponse, LLMError};

    struct Unreachable;

    #[async_trait]
    impl LLMProvider for Unreachable {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, LLMError> {
            Err(LLMError::EmptyResponse)
        }
    }

    #[test]
    fn test_registered_provider_matches_either_url_form() {
        let mut registry = ProviderRegistry::new(Client::new());
        let fake: Arc<dyn LLMProvider> = Arc::new(Unreachable);
        registry.register("http://fake.local/v1", fake.clone());

        let by_root = registry.get("http://fake.local/v1", None);
        let by_endpoint = registry.get("http://fake.local/v1/chat/completions", None);
        assert!(Arc::ptr_eq(&by_root, &fake));
        assert!(Arc::ptr_eq(&by_endpoint, &fake));
    }

    #[test]
    fn test_unregistered_endpoint_gets_fresh_provider() {
        let mut registry = ProviderRegistry::new(Client::new());
        let fake: Arc<dyn LLMProvider> = Arc::new(Unreachable);
        registry.register("http://fake.local/v1", fake.clone());

        let other = registry.get("https://api.openai.com/v1", Some("sk-test".to_string()));
        assert!(!Arc::ptr_eq(&other, &fake));
    }
}
