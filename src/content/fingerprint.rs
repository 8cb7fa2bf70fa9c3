// src/content/fingerprint.rs
// Content fingerprint: SHA-256 of the raw fetched bytes, hex encoded.
// Used to detect page changes between crawls, never to dedup crawl targets.

use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_length_hex() {
        let fp = Fingerprint::of(b"<html></html>");
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_deterministic() {
        let body = b"<html><title>Same</title></html>".to_vec();
        assert_eq!(Fingerprint::of(&body), Fingerprint::of(&body.clone()));
    }

    #[test]
    fn test_one_byte_change() {
        let a = Fingerprint::of(b"<p>hello</p>");
        let b = Fingerprint::of(b"<p>hellp</p>");
        assert_ne!(a, b);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            Fingerprint::of(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
