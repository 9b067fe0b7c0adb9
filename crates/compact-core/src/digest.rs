//! # Content Digests
//!
//! SHA-256 over [`CanonicalBytes`]. The signature of [`sha256_digest()`]
//! guarantees no digest is ever computed over non-canonical bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// A SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute a SHA-256 digest of canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest(bytes)
}

/// Hex form of [`sha256_digest()`].
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector_for_empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(
            sha256_hex(&cb),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_display_prefix() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        let shown = sha256_digest(&cb).to_string();
        assert!(shown.starts_with("sha256:"));
        assert_eq!(shown.len(), 7 + 64);
    }

    #[test]
    fn test_distinct_inputs_distinct_digests() {
        let a = CanonicalBytes::new(&serde_json::json!({"status": "encumbered"})).unwrap();
        let b = CanonicalBytes::new(&serde_json::json!({"status": "unencumbered"})).unwrap();
        assert_ne!(sha256_digest(&a), sha256_digest(&b));
    }
}
