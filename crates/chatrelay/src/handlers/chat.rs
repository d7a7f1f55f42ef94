//! Chat HTTP handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chat::{CompletionError, Conversation, ConversationStore};
use crate::llm::Message;
use crate::response;
use crate::server::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `POST /api/chat`.
///
/// Either `messages` (the whole conversation, kept by the client) or
/// `message` (the latest turn of a server-side session) must be present.
#[derive(Debug, Default, Deserialize)]
pub struct ChatApiRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatApiResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    session_id: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    message: &'static str,
}

/// Where one chat call goes.
struct Target {
    model: String,
    base_url: String,
    api_key: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatApiRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return bad_request(format!("Error: invalid request body: {}", rejection.body_text()));
        }
    };

    let target = resolve_target(&state, req.model, req.base_url).await;
    let provider = state.providers.get(&target.base_url, target.api_key);

    if let Some(messages) = req.messages.filter(|m| !m.is_empty()) {
        let mut conversation = Conversation::from(messages);
        let result = state
            .completions
            .complete(provider.as_ref(), &target.model, &mut conversation)
            .await;
        return reply(result, None);
    }

    let Some(message) = non_blank(req.message) else {
        return bad_request("Error: request must include 'message' or 'messages'");
    };

    let session_id =
        non_blank(req.session_id).unwrap_or_else(ConversationStore::new_session_id);
    let mut conversation = state.conversations.session(&session_id).lock_owned().await;

    // Detached: a dropped request must not skip the rollback in `send`.
    let completions = Arc::clone(&state.completions);
    let model = target.model;
    let turn = tokio::spawn(async move {
        completions
            .send(provider.as_ref(), &model, &mut conversation, message)
            .await
    });

    match turn.await {
        Ok(result) => reply(result, Some(session_id)),
        Err(e) => {
            error!(error = %e, session_id = %session_id, "Session turn task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatApiResponse {
                    response: "Error: chat turn aborted".to_string(),
                    session_id: Some(session_id),
                }),
            )
                .into_response()
        }
    }
}

/// GET /api/sessions/{session_id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let Some(conversation) = state.conversations.snapshot(&session_id).await else {
        return response::not_found("Session not found").into_response();
    };

    let response = SessionResponse {
        session_id,
        messages: conversation.into(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// DELETE /api/sessions/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    if !state.conversations.remove(&session_id) {
        return response::not_found("Session not found").into_response();
    }
    info!(session_id = %session_id, "Session deleted");
    (
        StatusCode::OK,
        Json(DeletedResponse {
            message: "Session deleted successfully",
        }),
    )
        .into_response()
}

// ============================================================================
// Helpers
// ============================================================================

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Pick the model, endpoint and credential for a call.
///
/// An explicit `base_url` wins. Otherwise a catalog model with the same name
/// supplies its provider's endpoint and key. The configured defaults fill in
/// the rest.
async fn resolve_target(
    state: &AppState,
    model: Option<String>,
    base_url: Option<String>,
) -> Target {
    let defaults = &state.defaults;
    let model = non_blank(model).unwrap_or_else(|| defaults.model.clone());

    if let Some(base_url) = non_blank(base_url) {
        return Target {
            model,
            base_url,
            api_key: defaults.api_key.clone(),
        };
    }

    let provider = match state.catalog.find_model_by_name(&model).await {
        Ok(found) => found.and_then(|m| m.provider),
        Err(e) => {
            warn!(error = %e, model = %model, "Catalog lookup failed, using defaults");
            None
        }
    };

    match provider {
        Some(provider) => Target {
            base_url: provider
                .base_url
                .unwrap_or_else(|| defaults.base_url.clone()),
            api_key: provider.api_key.or_else(|| defaults.api_key.clone()),
            model,
        },
        None => Target {
            model,
            base_url: defaults.base_url.clone(),
            api_key: defaults.api_key.clone(),
        },
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ChatApiResponse {
            response: message.into(),
            session_id: None,
        }),
    )
        .into_response()
}

fn reply(result: Result<String, CompletionError>, session_id: Option<String>) -> Response {
    match result {
        Ok(text) => (
            StatusCode::OK,
            Json(ChatApiResponse {
                response: text,
                session_id,
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ChatApiResponse {
                response: format!("Error from LLM API: {e}"),
                session_id,
            }),
        )
            .into_response(),
    }
}
