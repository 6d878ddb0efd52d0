//! Identifier and fingerprint generation.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a prefixed identifier such as `err_6f1c...`.
///
/// Prefixes keep ids of different record kinds distinguishable in logs.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Computes a stable, short fingerprint over a sequence of parts.
///
/// Parts are joined with a separator that cannot appear in error codes, hashed
/// with SHA-256, and truncated to 16 hex characters.
#[must_use]
pub fn fingerprint<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(part.as_ref().as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_prefix() {
        let id = generate_id("err");
        assert!(id.starts_with("err_"));
        assert_eq!(id.len(), 4 + 32);
    }

    #[test]
    fn test_generate_id_unique() {
        assert_ne!(generate_id("log"), generate_id("log"));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint(["NETWORK_ERROR", "render"]);
        let b = fingerprint(["NETWORK_ERROR", "render"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_fingerprint_separates_parts() {
        assert_ne!(fingerprint(["ab", "c"]), fingerprint(["a", "bc"]));
    }
}
