//! `SQLite` implementation of the model catalog.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use super::error::{CatalogError, CatalogResult};
use super::types::{
    LargeLanguageModel, ModelPatch, ModelProvider, NewModel, NewProvider, ProviderPatch,
};
use super::validate;

/// Provider and model records backed by a `SQLite` pool.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal row types for database queries
// ─────────────────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ProviderRow {
    id: i64,
    name: String,
    base_url: Option<String>,
    api_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProviderRow> for ModelProvider {
    fn from(row: ProviderRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            base_url: row.base_url,
            api_key: row.api_key,
            created_at: row.created_at,
        }
    }
}

/// A model joined with its (optional) provider.
#[derive(sqlx::FromRow)]
struct ModelRow {
    id: i64,
    name: String,
    provider_id: Option<i64>,
    created_at: DateTime<Utc>,
    p_id: Option<i64>,
    p_name: Option<String>,
    p_base_url: Option<String>,
    p_api_key: Option<String>,
    p_created_at: Option<DateTime<Utc>>,
}

impl From<ModelRow> for LargeLanguageModel {
    fn from(row: ModelRow) -> Self {
        let provider = match (row.p_id, row.p_name, row.p_created_at) {
            (Some(id), Some(name), Some(created_at)) => Some(ModelProvider {
                id,
                name,
                base_url: row.p_base_url,
                api_key: row.p_api_key,
                created_at,
            }),
            _ => None,
        };
        Self {
            id: row.id,
            name: row.name,
            provider_id: row.provider_id,
            provider,
            created_at: row.created_at,
        }
    }
}

const SELECT_PROVIDER: &str =
    "SELECT id, name, base_url, api_key, created_at FROM model_providers";

const SELECT_MODEL: &str = r#"
    SELECT m.id, m.name, m.provider_id, m.created_at,
           p.id AS p_id, p.name AS p_name, p.base_url AS p_base_url,
           p.api_key AS p_api_key, p.created_at AS p_created_at
    FROM large_language_models m
    LEFT JOIN model_providers p ON p.id = m.provider_id
"#;

// ─────────────────────────────────────────────────────────────────────────────
// Setup
// ─────────────────────────────────────────────────────────────────────────────

impl SqliteCatalog {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> CatalogResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CatalogError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options).await?;
        info!(path = %path.display(), "Opened catalog database");
        Self::with_pool(pool).await
    }

    /// Connect using a `sqlite:` URL, e.g. from `DATABASE_URL`.
    pub async fn connect(url: &str) -> CatalogResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options).await?;
        info!("Connected to catalog database from URL");
        Self::with_pool(pool).await
    }

    /// Fresh in-memory catalog with the full schema.
    ///
    /// Uses a single long-lived connection; every `:memory:` connection is
    /// its own database.
    pub async fn in_memory() -> CatalogResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> CatalogResult<Self> {
        create_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Cheap round trip used by readiness checks.
    pub async fn ping(&self) -> CatalogResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Creates all tables and indexes. Safe to call repeatedly.
async fn create_schema(pool: &SqlitePool) -> CatalogResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS model_providers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            base_url TEXT,
            api_key TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS large_language_models (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            provider_id INTEGER REFERENCES model_providers(id) ON DELETE RESTRICT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_models_provider ON large_language_models(provider_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_models_name ON large_language_models(name)")
        .execute(pool)
        .await?;

    Ok(())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|d| d.is_foreign_key_violation())
}

/// A model write that names a provider which no longer exists.
fn map_model_write_error(e: sqlx::Error, provider_id: Option<i64>) -> CatalogError {
    if is_foreign_key_violation(&e) {
        let id = provider_id.map_or_else(|| "?".to_string(), |id| id.to_string());
        return CatalogError::Invalid(format!("provider {id} does not exist"));
    }
    CatalogError::Database(e)
}

/// A provider delete that models still reference.
fn map_provider_delete_error(e: sqlx::Error, id: i64) -> CatalogError {
    if is_foreign_key_violation(&e) {
        return CatalogError::Conflict(format!("provider {id} is still used by a model"));
    }
    CatalogError::Database(e)
}

// ─────────────────────────────────────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────────────────────────────────────

impl SqliteCatalog {
    pub async fn list_providers(&self) -> CatalogResult<Vec<ModelProvider>> {
        let rows = sqlx::query_as::<_, ProviderRow>(&format!("{SELECT_PROVIDER} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_provider(&self, id: i64) -> CatalogResult<ModelProvider> {
        self.find_provider(id)
            .await?
            .ok_or_else(|| CatalogError::provider_not_found(id))
    }

    async fn find_provider(&self, id: i64) -> CatalogResult<Option<ModelProvider>> {
        let row = sqlx::query_as::<_, ProviderRow>(&format!("{SELECT_PROVIDER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create_provider(&self, new: NewProvider) -> CatalogResult<ModelProvider> {
        let name = validate::name(&new.name)?;
        let base_url = validate::base_url(new.base_url)?;
        let api_key = validate::non_empty(new.api_key);

        let result = sqlx::query(
            "INSERT INTO model_providers (name, base_url, api_key, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&name)
        .bind(&base_url)
        .bind(&api_key)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(id, name = %name, "Created provider");
        self.get_provider(id).await
    }

    pub async fn update_provider(
        &self,
        id: i64,
        patch: ProviderPatch,
    ) -> CatalogResult<ModelProvider> {
        let current = self.get_provider(id).await?;

        let name = match patch.name {
            Some(name) => validate::name(&name)?,
            None => current.name,
        };
        let base_url = match patch.base_url {
            Some(url) => validate::base_url(Some(url))?,
            None => current.base_url,
        };
        let api_key = match patch.api_key {
            Some(key) => validate::non_empty(Some(key)),
            None => current.api_key,
        };

        sqlx::query("UPDATE model_providers SET name = ?, base_url = ?, api_key = ? WHERE id = ?")
            .bind(&name)
            .bind(&base_url)
            .bind(&api_key)
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(id, "Updated provider");
        self.get_provider(id).await
    }

    /// Delete a provider. Refused while any model still references it.
    pub async fn delete_provider(&self, id: i64) -> CatalogResult<()> {
        self.get_provider(id).await?;

        let (dependents,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM large_language_models WHERE provider_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if dependents > 0 {
            return Err(CatalogError::Conflict(format!(
                "provider {id} is still used by {dependents} model(s)"
            )));
        }

        sqlx::query("DELETE FROM model_providers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_provider_delete_error(e, id))?;

        info!(id, "Deleted provider");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Models
// ─────────────────────────────────────────────────────────────────────────────

impl SqliteCatalog {
    pub async fn list_models(&self) -> CatalogResult<Vec<LargeLanguageModel>> {
        let rows = sqlx::query_as::<_, ModelRow>(&format!("{SELECT_MODEL} ORDER BY m.id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_model(&self, id: i64) -> CatalogResult<LargeLanguageModel> {
        let row = sqlx::query_as::<_, ModelRow>(&format!("{SELECT_MODEL} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Into::into)
            .ok_or_else(|| CatalogError::model_not_found(id))
    }

    /// First model registered under `name`, if any.
    pub async fn find_model_by_name(&self, name: &str) -> CatalogResult<Option<LargeLanguageModel>> {
        let row = sqlx::query_as::<_, ModelRow>(&format!(
            "{SELECT_MODEL} WHERE m.name = ? ORDER BY m.id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create_model(&self, new: NewModel) -> CatalogResult<LargeLanguageModel> {
        let name = validate::name(&new.name)?;
        self.require_provider(new.provider_id).await?;

        let result = sqlx::query(
            "INSERT INTO large_language_models (name, provider_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(&name)
        .bind(new.provider_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| map_model_write_error(e, new.provider_id))?;

        let id = result.last_insert_rowid();
        info!(id, name = %name, provider_id = ?new.provider_id, "Created model");
        self.get_model(id).await
    }

    pub async fn update_model(&self, id: i64, patch: ModelPatch) -> CatalogResult<LargeLanguageModel> {
        let current = self.get_model(id).await?;

        let name = match patch.name {
            Some(name) => validate::name(&name)?,
            None => current.name,
        };
        let provider_id = match patch.provider_id {
            Some(Some(provider_id)) => {
                self.require_provider(Some(provider_id)).await?;
                Some(provider_id)
            }
            Some(None) => None,
            None => current.provider_id,
        };

        sqlx::query("UPDATE large_language_models SET name = ?, provider_id = ? WHERE id = ?")
            .bind(&name)
            .bind(provider_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_model_write_error(e, provider_id))?;

        info!(id, "Updated model");
        self.get_model(id).await
    }

    pub async fn delete_model(&self, id: i64) -> CatalogResult<()> {
        let result = sqlx::query("DELETE FROM large_language_models WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::model_not_found(id));
        }
        info!(id, "Deleted model");
        Ok(())
    }

    /// A referenced provider must exist before a model may point at it.
    async fn require_provider(&self, provider_id: Option<i64>) -> CatalogResult<()> {
        let Some(provider_id) = provider_id else {
            return Ok(());
        };
        if self.find_provider(provider_id).await?.is_none() {
            return Err(CatalogError::Invalid(format!(
                "provider {provider_id} does not exist"
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
