//! Completion client: system prompt injection, retry and error classification
//! around a single chat-completion call.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::conversation::Conversation;
use crate::llm::{ChatRequest, ErrorKind, LLMError, LLMProvider};

/// Prompt used when a conversation arrives without a system message.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

// ============================================================================
// RetryPolicy
// ============================================================================

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failure. Doubles after each further failure.
    pub initial_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

// ============================================================================
// CompletionError
// ============================================================================

/// Classified outcome of a failed completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("authentication failed: {0}")]
    Authentication(#[source] LLMError),

    #[error("rate limit exceeded: {0}")]
    RateLimited(#[source] LLMError),

    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: LLMError,
    },

    #[error("unexpected error: {0}")]
    Unexpected(#[source] LLMError),
}

impl CompletionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompletionError::Authentication(_) => ErrorKind::Authentication,
            CompletionError::RateLimited(_) => ErrorKind::RateLimit,
            CompletionError::RetriesExhausted { .. } => ErrorKind::Transient,
            CompletionError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// The provider error that ended the call.
    pub fn last_error(&self) -> &LLMError {
        match self {
            CompletionError::Authentication(e)
            | CompletionError::RateLimited(e)
            | CompletionError::Unexpected(e) => e,
            CompletionError::RetriesExhausted { last, .. } => last,
        }
    }
}

// ============================================================================
// CompletionClient
// ============================================================================

/// Drives chat completions against an [`LLMProvider`].
#[derive(Debug, Clone)]
pub struct CompletionClient {
    system_prompt: String,
    retry: RetryPolicy,
    timeout: Duration,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Default for CompletionClient {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl CompletionClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            retry: RetryPolicy::default(),
            timeout: Self::DEFAULT_TIMEOUT,
            temperature: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Per-attempt deadline for the provider call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Append `user_message` to `conversation` and complete it.
    ///
    /// On failure the user message is removed again, so a stored
    /// conversation never ends on an unanswered turn.
    pub async fn send(
        &self,
        provider: &dyn LLMProvider,
        model: &str,
        conversation: &mut Conversation,
        user_message: impl Into<String>,
    ) -> Result<String, CompletionError> {
        conversation.ensure_system_prompt(&self.system_prompt);
        let checkpoint = conversation.len();
        conversation.push_user(user_message);

        let result = self.complete(provider, model, conversation).await;
        if result.is_err() {
            conversation.truncate(checkpoint);
        }
        result
    }

    /// Complete a conversation whose latest user turn is already present.
    ///
    /// On success the assistant reply is appended and returned.
    pub async fn complete(
        &self,
        provider: &dyn LLMProvider,
        model: &str,
        conversation: &mut Conversation,
    ) -> Result<String, CompletionError> {
        if conversation.ensure_system_prompt(&self.system_prompt) {
            debug!("Inserted default system prompt");
        }

        let request = ChatRequest {
            model: model.to_string(),
            messages: conversation.messages().to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let reply = self.call_with_retry(provider, request).await?;
        conversation.push_assistant(reply.clone());
        Ok(reply)
    }

    async fn call_with_retry(
        &self,
        provider: &dyn LLMProvider,
        request: ChatRequest,
    ) -> Result<String, CompletionError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.attempt(provider, request.clone()).await {
                Ok(reply) => {
                    if attempt > 1 {
                        info!(attempt, model = %request.model, "Completion succeeded after retry");
                    }
                    return Ok(reply);
                }
                Err(err) => err,
            };

            match err.kind() {
                ErrorKind::Authentication => {
                    warn!(error = %err, model = %request.model, "Provider rejected credentials");
                    return Err(CompletionError::Authentication(err));
                }
                ErrorKind::RateLimit => {
                    warn!(error = %err, model = %request.model, "Provider rate limit hit");
                    return Err(CompletionError::RateLimited(err));
                }
                ErrorKind::Unexpected => {
                    error!(error = ?err, model = %request.model, "Unexpected completion failure");
                    return Err(CompletionError::Unexpected(err));
                }
                ErrorKind::Transient if attempt >= max_attempts => {
                    warn!(attempts = attempt, error = %err, "Retries exhausted");
                    return Err(CompletionError::RetriesExhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                ErrorKind::Transient => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient completion failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        provider: &dyn LLMProvider,
        request: ChatRequest,
    ) -> Result<String, LLMError> {
        let response = tokio::time::timeout(self.timeout, provider.chat(request))
            .await
            .map_err(|_| LLMError::Timeout(self.timeout))??;
        response.into_content().ok_or(LLMError::EmptyResponse)
    }
}

// ============================================================================
// Tests
// ============================================================================
