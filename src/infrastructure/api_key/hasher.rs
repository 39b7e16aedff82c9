//! API key secret generation and hashing
//!
//! Secrets are random, URL-safe and shown to the caller exactly once. Only
//! the SHA-256 digest is stored; verification compares digests in constant time.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const HASH_SCHEME: &str = "sha256$";

/// Result of generating a new API key secret
#[derive(Debug, Clone)]
pub struct GeneratedSecret {
    /// Plaintext secret (only shown once at creation)
    pub secret: String,
    /// Hash for storage
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct ApiKeyHasher {
    /// Prefix for generated secrets
    prefix: String,
    key_bytes: usize,
}

impl ApiKeyHasher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            key_bytes: 32,
        }
    }

    pub fn with_key_bytes(mut self, bytes: usize) -> Self {
        self.key_bytes = bytes;
        self
    }

    /// Generate a new random secret
    pub fn generate(&self) -> GeneratedSecret {
        let mut random_bytes = vec![0u8; self.key_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        let secret = format!("{}{}", self.prefix, URL_SAFE_NO_PAD.encode(&random_bytes));
        let hash = self.hash(&secret);

        GeneratedSecret { secret, hash }
    }

    /// Hash a known secret verbatim (bootstrap admin keys, tests)
    pub fn from_secret(&self, secret: &str) -> GeneratedSecret {
        GeneratedSecret {
            secret: secret.to_string(),
            hash: self.hash(secret),
        }
    }

    pub fn hash(&self, plaintext: &str) -> String {
        format!("{}{}", HASH_SCHEME, URL_SAFE_NO_PAD.encode(Self::digest(plaintext)))
    }

    /// Compare the digest of `plaintext` with a stored hash in constant time.
    ///
    /// Malformed stored hashes never verify.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let Some(encoded) = stored_hash.strip_prefix(HASH_SCHEME) else {
            return false;
        };
        let Ok(stored_digest) = URL_SAFE_NO_PAD.decode(encoded) else {
            return false;
        };
        if stored_digest.len() != 32 {
            return false;
        }

        let computed = Self::digest(plaintext);
        computed.as_slice().ct_eq(stored_digest.as_slice()).into()
    }

    fn digest(plaintext: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(plaintext.as_bytes());
        hasher.finalize().into()
    }
}

impl Default for ApiKeyHasher {
    fn default() -> Self {
        Self::new("sg_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret() {
        let hasher = ApiKeyHasher::default();
        let generated = hasher.generate();

        assert!(generated.secret.starts_with("sg_"));
        // 32 bytes base64-encoded = 43 chars, plus prefix
        assert_eq!(generated.secret.len(), "sg_".len() + 43);
        assert!(generated.hash.starts_with("sha256$"));
        assert!(!generated.hash.contains(&generated.secret));
    }

    #[test]
    fn test_secrets_are_unique() {
        let hasher = ApiKeyHasher::default();
        let a = hasher.generate();
        let b = hasher.generate();

        assert_ne!(a.secret, b.secret);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_verify() {
        let hasher = ApiKeyHasher::default();
        let generated = hasher.generate();

        assert!(hasher.verify(&generated.secret, &generated.hash));
        assert!(!hasher.verify("sg_wrong", &generated.hash));
    }

    #[test]
    fn test_plaintext_never_matches_itself_as_hash() {
        let hasher = ApiKeyHasher::default();
        assert!(!hasher.verify("letmein", "letmein"));
        assert!(!hasher.verify("letmein", "sha256$letmein"));
    }

    #[test]
    fn test_truncated_hash_does_not_verify() {
        let hasher = ApiKeyHasher::default();
        let generated = hasher.from_secret("known-secret");
        let truncated = &generated.hash[..generated.hash.len() - 4];

        assert!(hasher.verify("known-secret", &generated.hash));
        assert!(!hasher.verify("known-secret", truncated));
    }

    #[test]
    fn test_hash_deterministic() {
        let hasher = ApiKeyHasher::default();
        assert_eq!(hasher.hash("abc"), hasher.hash("abc"));
        assert_eq!(hasher.from_secret("abc").hash, hasher.hash("abc"));
    }

    #[test]
    fn test_custom_key_bytes() {
        let generated = ApiKeyHasher::new("k_").with_key_bytes(64).generate();
        // 64 bytes base64-encoded = 86 chars, plus prefix
        assert_eq!(generated.secret.len(), 88);
    }
}
