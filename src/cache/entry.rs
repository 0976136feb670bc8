//! Cache Entry Module
//!
//! Expiration arithmetic shared by all stores, plus the in-memory entry type.

// == Cache Entry ==
/// A payload held by the in-memory store.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The serialized payload
    pub payload: Vec<u8>,
    /// Expiration timestamp (Unix seconds), None = no expiration
    pub expires_at: Option<i64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `payload` - The bytes to store
    /// * `ttl_seconds` - Lifetime in seconds, 0 = never expire
    pub fn new(payload: Vec<u8>, ttl_seconds: u64) -> Self {
        Self {
            payload,
            expires_at: expiration_for(ttl_seconds),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    pub fn is_expired(&self) -> bool {
        is_expired(self.expires_at, unix_now())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Absolute expiration for a lifetime in seconds; 0 means never.
pub fn expiration_for(ttl_seconds: u64) -> Option<i64> {
    if ttl_seconds == 0 {
        return None;
    }
    let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
    Some(unix_now().saturating_add(ttl))
}

/// An entry is stale once its expiration lies strictly in the past.
pub fn is_expired(expires_at: Option<i64>, now: i64) -> bool {
    matches!(expires_at, Some(expires) if expires < now)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new(b"test_value".to_vec(), 0);

        assert_eq!(entry.payload, b"test_value");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let before = unix_now();
        let entry = CacheEntry::new(b"test_value".to_vec(), 60);

        let expires = entry.expires_at.unwrap();
        assert!(expires >= before + 60);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(b"test_value".to_vec(), 1);

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(2100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = unix_now();

        // Still valid during the expiration second itself
        assert!(!is_expired(Some(now), now));
        assert!(is_expired(Some(now - 1), now));
        assert!(!is_expired(None, now));
    }

    #[test]
    fn test_expiration_for_huge_ttl_saturates() {
        assert_eq!(expiration_for(u64::MAX), Some(i64::MAX));
        assert_eq!(expiration_for(0), None);
    }
}
