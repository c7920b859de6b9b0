//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Public key is not a valid curve point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Sender address is not derived from the attached public key
    #[error("Sender does not match public key")]
    SenderMismatch,

    /// Seed material could not be parsed
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),
}
