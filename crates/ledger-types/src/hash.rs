//! Pluggable hash algorithms.
//!
//! Wire form is `"<name>:<64 lowercase hex>"`. BLAKE3 is preferred (and the
//! default); SHA-256 is the required baseline every implementation must
//! also support, since some deployments mandate FIPS-approved primitives.

use crate::error::{LedgerTypeError, LedgerTypeResult};

pub const DEFAULT_ALGORITHM: &str = "blake3";
pub const SUPPORTED_ALGORITHMS: &[&str] = &["blake3", "sha256"];

fn genesis_digest_hex() -> String {
    "0".repeat(64)
}

/// A hash algorithm identified by name, producing a 32-byte digest.
pub trait HashAlgorithm {
    fn name(&self) -> &'static str;
    fn hash(&self, bytes: &[u8]) -> [u8; 32];
}

pub struct Blake3Hasher;

impl HashAlgorithm for Blake3Hasher {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn hash(&self, bytes: &[u8]) -> [u8; 32] {
        *blake3::hash(bytes).as_bytes()
    }
}

pub struct Sha256Hasher;

impl HashAlgorithm for Sha256Hasher {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn hash(&self, bytes: &[u8]) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

/// Returns the hasher implementation for a supported algorithm name.
pub fn get_hasher(algorithm: &str) -> LedgerTypeResult<Box<dyn HashAlgorithm>> {
    match algorithm {
        "blake3" => Ok(Box::new(Blake3Hasher)),
        "sha256" => Ok(Box::new(Sha256Hasher)),
        other => Err(LedgerTypeError::UnsupportedAlgorithm {
            algorithm: other.to_string(),
        }),
    }
}

/// Computes `"<algo>:<hex digest>"` for `bytes` under `algorithm`.
pub fn compute_hash(algorithm: &str, bytes: &[u8]) -> LedgerTypeResult<String> {
    let hasher = get_hasher(algorithm)?;
    Ok(format!("{}:{}", hasher.name(), hex::encode(hasher.hash(bytes))))
}

/// Verifies that `bytes` hashes to the digest embedded in `tagged_hash`.
pub fn verify_hash(tagged_hash: &str, bytes: &[u8]) -> LedgerTypeResult<bool> {
    let algorithm = extract_algorithm(tagged_hash)?;
    let recomputed = compute_hash(&algorithm, bytes)?;
    Ok(constant_time_eq(recomputed.as_bytes(), tagged_hash.as_bytes()))
}

/// Extracts the algorithm name from `"<algo>:<hex>"`. Defaults to
/// [`DEFAULT_ALGORITHM`] if no colon is present (permissive parsing, as the
/// source tolerates bare digests in a couple of detection paths).
pub fn extract_algorithm(tagged_hash: &str) -> LedgerTypeResult<String> {
    match tagged_hash.split_once(':') {
        Some((algo, _)) if SUPPORTED_ALGORITHMS.contains(&algo) => Ok(algo.to_string()),
        Some((algo, _)) => Err(LedgerTypeError::UnsupportedAlgorithm {
            algorithm: algo.to_string(),
        }),
        None => Ok(DEFAULT_ALGORITHM.to_string()),
    }
}

/// Extracts just the hex digest portion of `"<algo>:<hex>"`.
pub fn extract_hex_digest(tagged_hash: &str) -> &str {
    match tagged_hash.split_once(':') {
        Some((_, hex)) => hex,
        None => tagged_hash,
    }
}

/// Validates `"<algo>:<64 lowercase hex>"` strictly: exactly one colon, a
/// supported algorithm prefix, and 64 lowercase hex characters.
pub fn validate_hash_format(tagged_hash: &str) -> LedgerTypeResult<()> {
    let parts: Vec<&str> = tagged_hash.split(':').collect();
    if parts.len() != 2 {
        return Err(LedgerTypeError::MalformedHash {
            hash: tagged_hash.to_string(),
        });
    }
    let (algo, digest) = (parts[0], parts[1]);
    if !SUPPORTED_ALGORITHMS.contains(&algo) {
        return Err(LedgerTypeError::MalformedHash {
            hash: tagged_hash.to_string(),
        });
    }
    if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
        return Err(LedgerTypeError::MalformedHash {
            hash: tagged_hash.to_string(),
        });
    }
    Ok(())
}

/// Builds the algorithm-tagged genesis marker: `"<algo>:" + "0" * 64`.
pub fn genesis_marker(algorithm: &str) -> String {
    format!("{algorithm}:{}", genesis_digest_hex())
}

/// Tests whether a hash string's hex digest is all zeros, regardless of
/// whether an algorithm prefix is present. Parsing genesis markers is kept
/// permissive (empty string, bare zeros, or tagged zeros all count) even
/// though emission always produces the algorithm-tagged form — see
/// DESIGN.md's "Open Questions resolved" for why.
pub fn is_genesis_marker(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    let digest = extract_hex_digest(value);
    digest.len() == 64 && digest.bytes().all(|b| b == b'0')
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_and_verify_round_trip() {
        let h = compute_hash("blake3", b"hello").unwrap();
        assert!(h.starts_with("blake3:"));
        assert!(verify_hash(&h, b"hello").unwrap());
        assert!(!verify_hash(&h, b"goodbye").unwrap());
    }

    #[test]
    fn sha256_and_blake3_differ() {
        let a = compute_hash("blake3", b"data").unwrap();
        let b = compute_hash("sha256", b"data").unwrap();
        assert_ne!(extract_hex_digest(&a), extract_hex_digest(&b));
    }

    #[test]
    fn genesis_marker_is_64_zeros_tagged() {
        let marker = genesis_marker("blake3");
        assert_eq!(marker, format!("blake3:{}", "0".repeat(64)));
        assert_eq!(extract_hex_digest(&marker).len(), 64);
    }

    #[test]
    fn is_genesis_marker_accepts_permissive_forms() {
        assert!(is_genesis_marker(""));
        assert!(is_genesis_marker(&"0".repeat(64)));
        assert!(is_genesis_marker(&genesis_marker("sha256")));
        assert!(!is_genesis_marker(&compute_hash("blake3", b"x").unwrap()));
    }

    #[test]
    fn validate_hash_format_rejects_bad_shapes() {
        assert!(validate_hash_format("blake3:abc").is_err());
        assert!(validate_hash_format(&format!("md5:{}", "0".repeat(64))).is_err());
        assert!(validate_hash_format(&format!("blake3:{}", "A".repeat(64))).is_err());
        assert!(validate_hash_format(&compute_hash("blake3", b"ok").unwrap()).is_ok());
    }

    #[test]
    fn unsupported_algorithm_rejected() {
        assert!(get_hasher("md5").is_err());
    }
}
