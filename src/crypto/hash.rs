//! Hashing utilities
//!
//! SHA-256 helpers used for address derivation and deterministic
//! contract addresses.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Derive a 20-byte account id from arbitrary seed material.
///
/// Takes the last 20 bytes of the SHA-256 digest, the same slice
/// position an EVM address takes from its public key hash.
pub fn account_id(data: &[u8]) -> [u8; 20] {
    let digest = sha256(data);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        let hash = sha256(data);
        assert_eq!(hash.len(), 32);
        assert_eq!(
            sha256_hex(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_account_id_is_digest_tail() {
        let id = account_id(b"hello world");
        let digest = sha256(b"hello world");
        assert_eq!(&id[..], &digest[12..]);
    }

    #[test]
    fn test_account_id_differs_per_input() {
        assert_ne!(account_id(b"a"), account_id(b"b"));
    }
}
