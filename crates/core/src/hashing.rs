//! Content identity helpers.
//!
//! The pipeline addresses processed images by a 32-bit rolling key of the
//! image reference so a re-submitted identical image can be recognized
//! without refetching it; the prediction audit trail stores a SHA-256
//! digest of the actual bytes.

use sha2::{Digest, Sha256};

/// 32-bit rolling content key of an image reference.
///
/// `key = key * 31 + byte`, wrapping. Matches the key the analysis
/// service uses to recognize an already-processed image, so it must not
/// change independently of the server side.
pub fn content_key(image_ref: &str) -> u32 {
    let mut key: u32 = 0;
    for byte in image_ref.bytes() {
        key = key.wrapping_mul(31).wrapping_add(u32::from(byte));
    }
    key
}

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_key_of_empty_reference_is_zero() {
        assert_eq!(content_key(""), 0);
    }

    #[test]
    fn content_key_matches_hand_rolled_value() {
        // 'a' = 97, 'b' = 98: 97 * 31 + 98 = 3105
        assert_eq!(content_key("ab"), 3_105);
    }

    #[test]
    fn content_key_is_deterministic() {
        let url = "https://cdn.example.com/panels/p1.png";
        assert_eq!(content_key(url), content_key(url));
    }

    #[test]
    fn content_key_distinguishes_references() {
        assert_ne!(
            content_key("https://cdn.example.com/panels/p1.png"),
            content_key("https://cdn.example.com/panels/p2.png"),
        );
    }

    #[test]
    fn content_key_wraps_instead_of_overflowing() {
        // Long data URIs must not panic in debug builds.
        let long_ref = "data:image/png;base64,".to_string() + &"A".repeat(10_000);
        let _ = content_key(&long_ref);
    }

    #[test]
    fn sha256_empty_input_produces_known_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_consistent_output() {
        let data = b"panel bytes";
        assert_eq!(sha256_hex(data), sha256_hex(data));
        assert_eq!(sha256_hex(data).len(), 64);
    }
}
