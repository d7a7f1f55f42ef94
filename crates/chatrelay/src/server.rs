use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;

use crate::catalog::SqliteCatalog;
use crate::chat::{CompletionClient, ConversationStore, RetryPolicy};
use crate::config::Config;
use crate::handlers;
use crate::llm::ProviderRegistry;

/// Connect timeout for outbound provider calls.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fallbacks applied when a chat request leaves a choice open.
#[derive(Debug, Clone)]
pub struct ChatDefaults {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub catalog: SqliteCatalog,
    pub providers: ProviderRegistry,
    pub completions: Arc<CompletionClient>,
    pub conversations: ConversationStore,
    pub defaults: Arc<ChatDefaults>,
}

impl AppState {
    /// Wire up state from the `llm` and `sessions` config sections.
    pub fn from_config(config: &Config, catalog: SqliteCatalog) -> Result<Self, reqwest::Error> {
        let sessions = &config.sessions;
        let config = &config.llm;
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        let completions = CompletionClient::new(config.system_prompt.clone())
            .with_retry(RetryPolicy::from(&config.retry))
            .with_timeout(config.request_timeout())
            .with_sampling(config.temperature, config.max_tokens);

        let defaults = ChatDefaults {
            model: config.default_model.clone(),
            base_url: config.default_base_url.clone(),
            api_key: config.api_key_from_env(),
        };

        Ok(Self {
            catalog,
            providers: ProviderRegistry::new(client),
            completions: Arc::new(completions),
            conversations: ConversationStore::with_ttl(sessions.idle_ttl()),
            defaults: Arc::new(defaults),
        })
    }
}

pub fn build_app(state: AppState, request_timeout_secs: u64) -> Router {
    let catalog_api = Router::new()
        .route(
            "/providers",
            get(handlers::catalog::list_providers).post(handlers::catalog::create_provider),
        )
        .route(
            "/providers/{id}",
            get(handlers::catalog::get_provider)
                .put(handlers::catalog::update_provider)
                .delete(handlers::catalog::delete_provider),
        )
        .route(
            "/models",
            get(handlers::catalog::list_models).post(handlers::catalog::create_model),
        )
        .route(
            "/models/{id}",
            get(handlers::catalog::get_model)
                .put(handlers::catalog::update_model)
                .delete(handlers::catalog::delete_model),
        );

    Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .route("/version", get(handlers::version))
        .route("/api/chat", post(handlers::chat))
        .route(
            "/api/sessions/{session_id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .nest("/models/api", catalog_api)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
}
