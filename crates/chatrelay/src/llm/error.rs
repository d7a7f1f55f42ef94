//! LLM error types and their retry classification.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when making LLM API calls.
#[derive(Debug, Error)]
pub enum LLMError {
    /// HTTP request failed
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API returned an error response
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limited (429)
    #[error("rate limited{}", retry_hint(.retry_after))]
    RateLimit { retry_after: Option<u64> },

    /// No response within the per-attempt deadline
    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// Response decoded but carried no assistant message
    #[error("response contained no choices")]
    EmptyResponse,
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|secs| format!(" (retry after {secs}s)"))
        .unwrap_or_default()
}

/// How a failed call should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials rejected. The user must fix them; never retried.
    Authentication,
    /// Provider-reported rate limit. Never retried.
    RateLimit,
    /// Network, timeout or server-side failure. Retried with backoff.
    Transient,
    /// Anything else. Never retried.
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Transient => "transient",
            ErrorKind::Unexpected => "unexpected",
        };
        f.write_str(s)
    }
}

impl LLMError {
    /// Build an error from a non-success HTTP response, consuming its body.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return LLMError::RateLimit { retry_after };
        }
        let message = response.text().await.unwrap_or_default();
        LLMError::Api { status, message }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LLMError::Request(e) => {
                if e.is_decode() || e.is_builder() {
                    ErrorKind::Unexpected
                } else {
                    ErrorKind::Transient
                }
            }
            LLMError::Api { status, .. } => match status {
                401 | 403 => ErrorKind::Authentication,
                429 => ErrorKind::RateLimit,
                408 | 409 | 500..=599 => ErrorKind::Transient,
                _ => ErrorKind::Unexpected,
            },
            LLMError::RateLimit { .. } => ErrorKind::RateLimit,
            LLMError::Timeout(_) => ErrorKind::Transient,
            LLMError::EmptyResponse => ErrorKind::Unexpected,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> LLMError {
        LLMError::Api {
            status,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(api(401).kind(), ErrorKind::Authentication);
        assert_eq!(api(403).kind(), ErrorKind::Authentication);
        assert_eq!(api(429).kind(), ErrorKind::RateLimit);
        assert_eq!(api(500).kind(), ErrorKind::Transient);
        assert_eq!(api(503).kind(), ErrorKind::Transient);
        assert_eq!(api(408).kind(), ErrorKind::Transient);
        assert_eq!(api(400).kind(), ErrorKind::Unexpected);
        assert_eq!(api(404).kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn test_non_status_classification() {
        assert_eq!(
            LLMError::RateLimit { retry_after: Some(3) }.kind(),
            ErrorKind::RateLimit
        );
        assert_eq!(
            LLMError::Timeout(Duration::from_secs(5)).kind(),
            ErrorKind::Transient
        );
        assert_eq!(LLMError::EmptyResponse.kind(), ErrorKind::Unexpected);
        assert!(LLMError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(!api(401).is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(api(500).to_string(), "api error (status 500): boom");
        assert_eq!(
            LLMError::Timeout(Duration::from_secs(60)).to_string(),
            "request timed out after 60s"
        );
        assert_eq!(ErrorKind::RateLimit.to_string(), "rate_limit");
    }

    #[test]
    fn test_rate_limit_display() {
        assert_eq!(
            LLMError::RateLimit {
                retry_after: Some(20)
            }
            .to_string(),
            "rate limited (retry after 20s)"
        );
        assert_eq!(
            LLMError::RateLimit { retry_after: None }.to_string(),
            "rate limited"
        );
    }
}
