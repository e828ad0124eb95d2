//! Cache key validation
//!
//! Keys are used verbatim as filename stems, so the accepted alphabet is
//! restricted to characters that are safe on every filesystem the cache
//! runs on: `[a-z0-9_-]`, 1 to 120 characters.

use crate::error::{CacheError, CacheResult};

/// Maximum key length in bytes
pub const MAX_KEY_LEN: usize = 120;

/// Returns true iff `key` matches `[a-z0-9_-]{1,120}`.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-'))
}

/// Validate a key at a public entry point.
///
/// Every public operation calls this before touching any state; a rejected
/// key therefore never reaches the index, the journal, or the filesystem.
pub fn validate_key(key: &str) -> CacheResult<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(CacheError::InvalidKey { key: key.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_full_alphabet() {
        assert!(is_valid_key("abcdefghijklmnopqrstuvwxyz0123456789_-"));
        assert!(is_valid_key("a"));
        assert!(is_valid_key("thumb_1280x720-v2"));
    }

    #[test]
    fn test_accepts_max_length() {
        let key = "k".repeat(MAX_KEY_LEN);
        assert!(is_valid_key(&key));
    }

    #[test]
    fn test_rejects_too_long() {
        let key = "k".repeat(MAX_KEY_LEN + 1);
        assert!(!is_valid_key(&key));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(!is_valid_key(""));
    }

    #[test]
    fn test_rejects_bad_characters() {
        assert!(!is_valid_key("Key"));
        assert!(!is_valid_key("has space"));
        assert!(!is_valid_key("dot.ted"));
        assert!(!is_valid_key("sla/sh"));
        assert!(!is_valid_key("uni\u{00e9}"));
        assert!(!is_valid_key("new\nline"));
    }

    #[test]
    fn test_validate_returns_invalid_key() {
        let err = validate_key("NOPE").unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey { .. }));
        assert!(validate_key("fine-key_9").is_ok());
    }
}
