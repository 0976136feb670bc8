//! Request DTOs for the cache maintenance API
//!
//! Defines query parameters and key validation for incoming requests.

use serde::Deserialize;

/// Query string of `PUT /entries/:key`
///
/// # Fields
/// - `ttl`: Optional lifetime in seconds (server default if omitted, 0 = forever)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveQuery {
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Validates a cache id taken from the path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_query_deserialize() {
        let query: SaveQuery = serde_json::from_str(r#"{"ttl": 60}"#).unwrap();
        assert_eq!(query.ttl, Some(60));

        let query: SaveQuery = serde_json::from_str("{}").unwrap();
        assert!(query.ttl.is_none());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("").is_some());
        assert!(validate_key("user:42").is_none());
        // Long keys are fine; the file store hashes them
        assert!(validate_key(&"k".repeat(1000)).is_none());
    }
}
