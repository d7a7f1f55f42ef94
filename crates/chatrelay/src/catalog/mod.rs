//! Model catalog: provider and model records in SQLite.

mod error;
mod sqlite;
mod types;
mod validate;

pub use error::{CatalogError, CatalogResult};
pub use sqlite::SqliteCatalog;
pub use types::{LargeLanguageModel, ModelPatch, ModelProvider, NewModel, NewProvider, ProviderPatch};
