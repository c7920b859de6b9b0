//! # Shared Crypto
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Digests, address derivation |
//! | `signatures` | Ed25519 | Transaction, vote and miner identity signing |
//! | `transactions` | Ed25519 over canonical bytes | Signing and verifying `Transaction`s |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - Secret key material is zeroized on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;
pub mod transactions;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{address_from_public_key, sha256, sha256_many};
pub use signatures::{verify_raw, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use transactions::{sign_transaction, verify_transaction};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
