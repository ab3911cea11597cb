//! Shared key generation for blob destinations.
//!
//! Key format: `blobs/{uuid}`. Keys are opaque to everything outside the
//! destination that issued them.

use uuid::Uuid;

/// Generate a fresh blob key. All backends must use this format so stored
/// trees stay consistent across destinations.
pub fn generate_blob_key() -> String {
    format!("blobs/{}", Uuid::new_v4())
}

/// Reject keys that could escape a destination's root.
pub fn validate_blob_key(key: &str) -> bool {
    !key.is_empty() && !key.contains("..") && !key.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_valid_and_unique() {
        let a = generate_blob_key();
        let b = generate_blob_key();
        assert!(a.starts_with("blobs/"));
        assert_ne!(a, b);
        assert!(validate_blob_key(&a));
    }

    #[test]
    fn traversal_keys_rejected() {
        assert!(!validate_blob_key("../etc/passwd"));
        assert!(!validate_blob_key("/etc/passwd"));
        assert!(!validate_blob_key("blobs/../../x"));
        assert!(!validate_blob_key(""));
    }
}
