//! Payload validation shared by create and update paths.

use url::Url;

use super::error::{CatalogError, CatalogResult};

/// Trim `value`, mapping blank strings to `None`.
pub(super) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(super) fn name(value: &str) -> CatalogResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Invalid("name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Blank means unset; anything else must be an absolute http(s) URL.
pub(super) fn base_url(value: Option<String>) -> CatalogResult<Option<String>> {
    let Some(value) = non_empty(value) else {
        return Ok(None);
    };
    let parsed = Url::parse(&value)
        .map_err(|e| CatalogError::Invalid(format!("invalid base_url '{value}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CatalogError::Invalid(format!(
            "invalid base_url '{value}': scheme must be http or https"
        )));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_become_none() {
        assert_eq!(non_empty(Some("   ".to_string())), None);
        assert_eq!(non_empty(Some(" k ".to_string())), Some("k".to_string()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn name_is_trimmed_and_required() {
        assert_eq!(name("  openai ").unwrap(), "openai");
        assert!(matches!(name(" "), Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn base_url_must_be_http() {
        assert_eq!(
            base_url(Some("https://api.openai.com/v1".to_string())).unwrap(),
            Some("https://api.openai.com/v1".to_string())
        );
        assert_eq!(base_url(Some(String::new())).unwrap(), None);
        assert!(base_url(Some("not a url".to_string())).is_err());
        assert!(base_url(Some("ftp://example.com".to_string())).is_err());
    }
}
