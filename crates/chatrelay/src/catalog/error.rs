//! Catalog error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Payload failed validation.
    #[error("{0}")]
    Invalid(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Operation would break a reference between records.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    pub(crate) fn provider_not_found(id: i64) -> Self {
        CatalogError::NotFound {
            entity: "provider",
            id,
        }
    }

    pub(crate) fn model_not_found(id: i64) -> Self {
        CatalogError::NotFound { entity: "model", id }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
