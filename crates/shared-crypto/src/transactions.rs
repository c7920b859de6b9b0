//! Transaction signing and verification.

use crate::{hashing::address_from_public_key, signatures::verify_raw, CryptoError, Ed25519KeyPair};
use shared_types::Transaction;

/// Fills `public_key`, `sender` and `txid`, then signs the canonical bytes.
pub fn sign_transaction(tx: &mut Transaction, keypair: &Ed25519KeyPair) {
    tx.public_key = *keypair.public_key().as_bytes();
    tx.sender = keypair.address();
    tx.seal();
    tx.signature = keypair.sign(&tx.canonical_bytes()).to_bytes();
}

/// Checks sender derivation and the Ed25519 signature over the canonical bytes.
///
/// Coinbase transactions carry no signature and are not accepted here.
pub fn verify_transaction(tx: &Transaction) -> Result<(), CryptoError> {
    if address_from_public_key(&tx.public_key) != tx.sender {
        return Err(CryptoError::SenderMismatch);
    }
    verify_raw(&tx.public_key, &tx.canonical_bytes(), &tx.signature)
}
