//! Keyed hashing used for request signing

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::hmac;

/// HMAC-SHA256 of `message`, base64 encoded
pub fn hmac_sha256_base64(key: &[u8], message: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    STANDARD.encode(hmac::sign(&key, message).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha256_base64() {
        assert_eq!(
            hmac_sha256_base64(b"key", b"The quick brown fox jumps over the lazy dog"),
            "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg="
        );
    }

    #[test]
    fn test_key_changes_signature() {
        let message = b"PUT\n\n\n5";
        assert_ne!(
            hmac_sha256_base64(b"first-key", message),
            hmac_sha256_base64(b"second-key", message)
        );
    }
}
