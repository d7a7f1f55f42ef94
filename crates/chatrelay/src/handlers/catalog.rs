//! Model catalog CRUD handlers (`/models/api/...`).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::catalog::{
    CatalogError, LargeLanguageModel, ModelPatch, ModelProvider, NewModel, NewProvider,
    ProviderPatch,
};
use crate::response;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        match self {
            CatalogError::Invalid(msg) => response::bad_request(msg).into_response(),
            e @ CatalogError::NotFound { .. } => response::not_found(e.to_string()).into_response(),
            CatalogError::Conflict(msg) => response::conflict(msg).into_response(),
            CatalogError::Database(e) => {
                error!(error = ?e, "Catalog database failure");
                response::internal_error("database error").into_response()
            }
        }
    }
}

fn created(message: &'static str, id: i64) -> Response {
    (
        StatusCode::CREATED,
        Json(MutationResponse {
            message,
            id: Some(id),
        }),
    )
        .into_response()
}

fn done(message: &'static str) -> Response {
    (StatusCode::OK, Json(MutationResponse { message, id: None })).into_response()
}

// ============================================================================
// Providers
// ============================================================================

/// GET /models/api/providers
pub async fn list_providers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelProvider>>, CatalogError> {
    Ok(Json(state.catalog.list_providers().await?))
}

/// GET /models/api/providers/{id}
pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ModelProvider>, CatalogError> {
    Ok(Json(state.catalog.get_provider(id).await?))
}

/// POST /models/api/providers
pub async fn create_provider(
    State(state): State<AppState>,
    Json(req): Json<NewProvider>,
) -> Result<Response, CatalogError> {
    let provider = state.catalog.create_provider(req).await?;
    Ok(created("Provider created successfully", provider.id))
}

/// PUT /models/api/providers/{id}
pub async fn update_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ProviderPatch>,
) -> Result<Response, CatalogError> {
    state.catalog.update_provider(id, req).await?;
    Ok(done("Provider updated successfully"))
}

/// DELETE /models/api/providers/{id}
pub async fn delete_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, CatalogError> {
    state.catalog.delete_provider(id).await?;
    Ok(done("Provider deleted successfully"))
}

// ============================================================================
// Models
// ============================================================================

/// GET /models/api/models
pub async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<LargeLanguageModel>>, CatalogError> {
    Ok(Json(state.catalog.list_models().await?))
}

/// GET /models/api/models/{id}
pub async fn get_model(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LargeLanguageModel>, CatalogError> {
    Ok(Json(state.catalog.get_model(id).await?))
}

/// POST /models/api/models
pub async fn create_model(
    State(state): State<AppState>,
    Json(req): Json<NewModel>,
) -> Result<Response, CatalogError> {
    let model = state.catalog.create_model(req).await?;
    Ok(created("Model created successfully", model.id))
}

/// PUT /models/api/models/{id}
pub async fn update_model(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ModelPatch>,
) -> Result<Response, CatalogError> {
    state.catalog.update_model(id, req).await?;
    Ok(done("Model updated successfully"))
}

/// DELETE /models/api/models/{id}
pub async fn delete_model(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, CatalogError> {
    state.catalog.delete_model(id).await?;
    Ok(done("Model deleted successfully"))
}
