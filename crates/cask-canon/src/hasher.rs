use serde::Serialize;
use serde_json::Value;

use cask_types::Digest;

use crate::canonical::{canonical_bytes, canonical_value_bytes};
use crate::error::CanonResult;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"cask-value-v1"`,
/// `"cask-route-v1"`) that is prepended to every hash computation. This
/// prevents cross-namespace collisions: a value and a route pointer with
/// identical bytes produce different digests.
pub struct DigestHasher {
    domain: &'static str,
}

impl DigestHasher {
    /// Hasher for value content identities.
    pub const VALUE: Self = Self {
        domain: "cask-value-v1",
    };
    /// Hasher for escaped route pointers.
    pub const ROUTE: Self = Self {
        domain: "cask-route-v1",
    };
    /// Hasher for typed entity records.
    pub const ENTITY: Self = Self {
        domain: "cask-entity-v1",
    };
    /// Hasher for commit snapshot entities.
    pub const COMMIT: Self = Self {
        domain: "cask-commit-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value over its canonical bytes.
    pub fn hash_canonical<T: Serialize>(&self, value: &T) -> CanonResult<Digest> {
        Ok(self.hash(&canonical_bytes(value)?))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Content identity of a structured value: the value-domain hash of its
/// canonical bytes. This is the address of the value in the flat object
/// space.
pub fn content_id(value: &Value) -> CanonResult<Digest> {
    Ok(DigestHasher::VALUE.hash(&canonical_value_bytes(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rehashing_canonical_bytes_is_stable() {
        let bytes = canonical_value_bytes(&json!({"route": "/a/b", "rev": 3})).unwrap();
        assert_eq!(
            DigestHasher::VALUE.hash(&bytes),
            DigestHasher::VALUE.hash(&bytes)
        );
    }

    #[test]
    fn different_domains_produce_different_digests() {
        // An escaped pointer stored as a value must not alias the route
        // digest of that same pointer.
        let pointer = b"/users/alice";
        let value = DigestHasher::VALUE.hash(pointer);
        let route = DigestHasher::ROUTE.hash(pointer);
        let entity = DigestHasher::ENTITY.hash(pointer);
        assert_ne!(value, route);
        assert_ne!(value, entity);
        assert_ne!(route, entity);
    }

    #[test]
    fn verify_detects_drifted_bytes() {
        let mut bytes = canonical_value_bytes(&json!({"balance": 100})).unwrap();
        let d = DigestHasher::VALUE.hash(&bytes);
        assert!(DigestHasher::VALUE.verify(&bytes, &d));
        let idx = bytes.len() - 2;
        bytes[idx] ^= 1;
        assert!(!DigestHasher::VALUE.verify(&bytes, &d));
    }

    #[test]
    fn content_id_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y": 2, "x": 1}"#).unwrap();
        assert_eq!(content_id(&a).unwrap(), content_id(&b).unwrap());
    }

    #[test]
    fn content_id_differs_for_different_values() {
        assert_ne!(
            content_id(&json!({"x": 1})).unwrap(),
            content_id(&json!({"x": 2})).unwrap()
        );
    }

    #[test]
    fn hash_canonical_matches_manual_path() {
        let v = json!({"b": 2, "a": 1});
        let via_helper = DigestHasher::VALUE.hash_canonical(&v).unwrap();
        assert_eq!(via_helper, content_id(&v).unwrap());
    }

    #[test]
    fn caller_supplied_domains_stay_separated() {
        let mirror = DigestHasher::new("cask-mirror-v1");
        let pointer = b"/tips/abc";
        assert_ne!(mirror.hash(pointer), DigestHasher::ROUTE.hash(pointer));
        assert_eq!(mirror.domain(), "cask-mirror-v1");
    }
}
