//! Shared helpers for router-level tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use chatrelay::catalog::SqliteCatalog;
use chatrelay::chat::{CompletionClient, ConversationStore, RetryPolicy};
use chatrelay::llm::{ChatRequest, ChatResponse, Choice, LLMError, LLMProvider, Message, ProviderRegistry};
use chatrelay::server::{AppState, ChatDefaults, build_app};

pub const DEFAULT_BASE_URL: &str = "http://default.test/v1";
pub const SYSTEM_PROMPT: &str = "You are a test assistant.";

/// Replays scripted outcomes, then echoes the last user message.
#[derive(Default)]
pub struct FakeProvider {
    script: Mutex<VecDeque<Result<String, LLMError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    delay: Option<Duration>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A provider that takes `delay` to answer every call.
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn push(&self, outcome: Result<String, LLMError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for FakeProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LLMError> {
        let echo = request
            .messages
            .last()
            .map(|m| format!("echo: {}", m.content))
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content = match self.script.lock().unwrap().pop_front() {
            Some(outcome) => outcome?,
            None => echo,
        };
        Ok(ChatResponse {
            id: "chatcmpl-fake".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(content),
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// Build an app whose default endpoint is served by `provider`.
pub async fn test_app(provider: Arc<FakeProvider>) -> TestApp {
    test_app_with(provider, Vec::new()).await
}

/// Like [`test_app`], with extra providers registered by base URL.
pub async fn test_app_with(
    provider: Arc<FakeProvider>,
    extra: Vec<(&str, Arc<FakeProvider>)>,
) -> TestApp {
    let catalog = SqliteCatalog::in_memory().await.unwrap();

    let mut providers = ProviderRegistry::new(reqwest::Client::new());
    providers.register(DEFAULT_BASE_URL, provider);
    for (base_url, fake) in extra {
        providers.register(base_url, fake);
    }

    let completions = CompletionClient::new(SYSTEM_PROMPT).with_retry(RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    });

    let state = AppState {
        catalog,
        providers,
        completions: Arc::new(completions),
        conversations: ConversationStore::new(),
        defaults: Arc::new(ChatDefaults {
            model: "gpt-4".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: Some("sk-env".to_string()),
        }),
    };

    TestApp {
        router: build_app(state.clone(), 30),
        state,
    }
}

/// Send a request and decode the JSON body (`Value::Null` if empty or not JSON).
pub async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    match body {
        Some(json) => call_raw(router, method, uri, &json.to_string()).await,
        None => {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            send(router, request).await
        }
    }
}

/// Send `body` verbatim as `application/json`.
pub async fn call_raw(
    router: &Router,
    method: Method,
    uri: &str,
    body: &str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
