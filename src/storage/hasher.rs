use sha2::{Digest, Sha256};

/// Content address of an attachment payload: SHA256 hex digest.
pub fn content_key(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA256 of `salt || secret`, the derivation used for password verifiers.
pub fn salted_digest(salt: &[u8], secret: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key() {
        assert_eq!(
            content_key(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_empty_content_key() {
        assert_eq!(
            content_key(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_salt_changes_digest() {
        assert_ne!(salted_digest(b"a", b"pw"), salted_digest(b"b", b"pw"));
    }
}
