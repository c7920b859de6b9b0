//! # SHA-256 Hashing
//!
//! One-shot helpers and address derivation.

use sha2::{Digest, Sha256};
use shared_types::{Address, Hash, PublicKey};

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Hash the concatenation of several inputs.
pub fn sha256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Address owned by `public_key`: the first 20 bytes of its SHA-256.
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let digest = sha256(public_key);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[..20]);
    address
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_many_equals_concatenation() {
        assert_eq!(sha256_many(&[b"ab", b"c"]), sha256(b"abc"));
    }

    #[test]
    fn test_address_is_hash_prefix() {
        let pk = [7u8; 32];
        assert_eq!(address_from_public_key(&pk)[..], sha256(&pk)[..20]);
    }
}
