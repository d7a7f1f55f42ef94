//! Catalog records and their create/update payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// An upstream API endpoint and the credential used to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProvider {
    pub id: i64,
    pub name: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A model identifier, optionally served by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LargeLanguageModel {
    pub id: i64,
    pub name: String,
    pub provider_id: Option<i64>,
    /// The linked provider record, `None` when unlinked.
    pub provider: Option<ModelProvider>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProvider {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Partial provider update. Absent fields keep their value; an empty string
/// clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewModel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub provider_id: Option<i64>,
}

/// Partial model update. Absent fields keep their value.
///
/// `provider_id` is three-state:
/// - `None` = keep the current link
/// - `Some(None)` = unlink (`"provider_id": null`)
/// - `Some(Some(id))` = link to `id`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub provider_id: Option<Option<i64>>,
}

/// Wrap any present value, including `null`, in `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_patch_distinguishes_null_from_absent() {
        let absent: ModelPatch = serde_json::from_str(r#"{"name": "gpt-4o"}"#).unwrap();
        assert_eq!(absent.provider_id, None);

        let cleared: ModelPatch = serde_json::from_str(r#"{"provider_id": null}"#).unwrap();
        assert_eq!(cleared.provider_id, Some(None));

        let linked: ModelPatch = serde_json::from_str(r#"{"provider_id": 7}"#).unwrap();
        assert_eq!(linked.provider_id, Some(Some(7)));
    }
}
