//! Password digests.
//!
//! Account and cookie passwords are stored as the MD5 digest of the
//! plaintext, rendered as 32 lowercase hex characters. Older cookie files
//! hold the plaintext itself, which `is_hashed` is used to detect.

use md5::{Digest, Md5};

/// Length of a hex-encoded digest
pub const HASH_LENGTH: usize = 32;

/// Hash a plaintext password into its stored form.
pub fn hash(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

/// Check whether a stored value is already a digest.
///
/// A 32 character plaintext made only of digits and `a-f` is misdetected
/// as a digest. That is unlikely enough for a real password to accept.
pub fn is_hashed(value: &str) -> bool {
    value.len() == HASH_LENGTH && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash("secret"), hash("secret"));
        assert_ne!(hash("secret"), hash("Secret"));
    }

    #[test]
    fn test_hash_known_values() {
        assert_eq!(hash(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(hash("admin"), "21232f297a57a5a743894a0e4a801fc3");
    }

    #[test]
    fn test_hash_output_is_detected_as_hashed() {
        for password in ["", "admin", "p4ss w0rd", "ümlaut", "0123456789abcdef0123456789abcdef"] {
            assert!(is_hashed(&hash(password)), "digest of {:?}", password);
        }
    }

    #[test]
    fn test_is_hashed_accepts_lowercase_hex() {
        assert!(is_hashed("0123456789abcdef0123456789abcdef"));
        assert!(is_hashed(&"a".repeat(32)));
        assert!(is_hashed(&"0".repeat(32)));
    }

    #[test]
    fn test_is_hashed_rejects_wrong_length() {
        assert!(!is_hashed(""));
        assert!(!is_hashed(&"a".repeat(31)));
        assert!(!is_hashed(&"a".repeat(33)));
        assert!(!is_hashed("secret"));
    }

    #[test]
    fn test_is_hashed_rejects_non_hex() {
        assert!(!is_hashed(&format!("{}g", "a".repeat(31))));
        assert!(!is_hashed(&format!("{} ", "a".repeat(31))));
        assert!(!is_hashed(&"A".repeat(32)));
        assert!(!is_hashed("0123456789ABCDEF0123456789abcdef"));
    }

    #[test]
    fn test_is_hashed_rejects_multibyte_of_same_byte_length() {
        // 16 two-byte chars make 32 bytes
        assert!(!is_hashed(&"é".repeat(16)));
    }
}
