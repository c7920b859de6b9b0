//! # Core Domain Entities
//!
//! Defines the ledger entities exchanged between the engine's subsystems.
//!
//! ## Clusters
//!
//! - **Value**: `OutPoint`, `TxOutput`, `Transaction`
//! - **Chain**: `BlockHeader`, `Block`, merkle root
//!
//! ## Canonical Encoding
//!
//! Every hash in the system is SHA-256 over a hand-written, length-prefixed,
//! little-endian byte layout prefixed by a domain tag. Serde is never used for
//! hashing, so adding a JSON field can never silently change a txid.

use crate::errors::TransactionError;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 20-byte address, the first 20 bytes of `sha256(public_key)`.
pub type Address = [u8; 20];

/// Value in base units.
pub type Amount = u64;

/// Milliseconds since the UNIX epoch.
pub type Timestamp = u64;

/// Base units per coin.
pub const COIN: Amount = 100_000_000;

/// The all-zero hash (genesis parent, empty merkle root).
pub const ZERO_HASH: Hash = [0u8; 32];

/// Sender address used by coinbase transactions.
pub const COINBASE_SENDER: Address = [0u8; 20];

const TX_DOMAIN: &[u8] = b"LCTX\x01";
const HEADER_DOMAIN: &[u8] = b"LCHDR\x01";

/// Fixed serialized size of a block header in bytes.
pub const HEADER_SIZE: usize = 8 + 32 + 8 + 32 + 4 + 8 + 32 + 32;

/// SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Short hex rendering used in log lines.
pub fn short_hex(bytes: &[u8]) -> String {
    let end = bytes.len().min(6);
    hex::encode(&bytes[..end])
}

// =============================================================================
// CLUSTER A: VALUE
// =============================================================================

/// Reference to a transaction output: `(txid, vout)`.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    /// Producing transaction.
    #[serde_as(as = "Hex")]
    pub txid: Hash,
    /// Output index within the producing transaction.
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.txid), self.vout)
    }
}

/// A transaction output: value locked to an owner address.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub amount: Amount,
    #[serde_as(as = "Hex")]
    pub owner: Address,
}

impl TxOutput {
    pub fn new(amount: Amount, owner: Address) -> Self {
        Self { amount, owner }
    }
}

/// A signed value transfer.
///
/// `amount` is the value paid to `recipient`; the remaining outputs are change.
/// The hybrid model requires both UTXO inputs and a strictly sequential
/// per-sender `nonce`.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde_as(as = "Hex")]
    pub sender: Address,
    #[serde_as(as = "Hex")]
    pub recipient: Address,
    pub amount: Amount,
    pub fee: Amount,
    pub nonce: u64,
    pub inputs: Vec<OutPoint>,
    pub outputs: Vec<TxOutput>,
    #[serde_as(as = "Hex")]
    pub signature: Signature,
    #[serde_as(as = "Hex")]
    pub public_key: PublicKey,
    pub timestamp: Timestamp,
    #[serde_as(as = "Hex")]
    pub txid: Hash,
}

impl Transaction {
    /// Builds the coinbase paying `value` to `miner` at `height`.
    ///
    /// The height is carried in the nonce so every coinbase has a distinct txid.
    pub fn coinbase(height: u64, miner: Address, value: Amount, timestamp: Timestamp) -> Self {
        let mut tx = Self {
            sender: COINBASE_SENDER,
            recipient: miner,
            amount: value,
            fee: 0,
            nonce: height,
            inputs: Vec::new(),
            outputs: vec![TxOutput::new(value, miner)],
            signature: [0u8; 64],
            public_key: [0u8; 32],
            timestamp,
            txid: ZERO_HASH,
        };
        tx.seal();
        tx
    }

    /// Canonical bytes covered by the txid and the signature.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            TX_DOMAIN.len() + 20 + 20 + 24 + 8 + self.inputs.len() * 36 + self.outputs.len() * 28 + 40,
        );
        buf.extend_from_slice(TX_DOMAIN);
        buf.extend_from_slice(&self.sender);
        buf.extend_from_slice(&self.recipient);
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf.extend_from_slice(&self.fee.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(&input.txid);
            buf.extend_from_slice(&input.vout.to_le_bytes());
        }
        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            buf.extend_from_slice(&output.amount.to_le_bytes());
            buf.extend_from_slice(&output.owner);
        }
        buf.extend_from_slice(&self.public_key);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf
    }

    /// Computes the txid from the canonical fields.
    pub fn compute_txid(&self) -> Hash {
        sha256(&self.canonical_bytes())
    }

    /// Recomputes and stores the txid. Call before signing.
    pub fn seal(&mut self) {
        self.txid = self.compute_txid();
    }

    /// Size used for fee-rate and block-size accounting.
    pub fn serialized_size(&self) -> usize {
        self.canonical_bytes().len() + 64 + 32
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty() && self.sender == COINBASE_SENDER
    }

    /// Sum of all outputs, `None` on overflow.
    pub fn output_total(&self) -> Option<Amount> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
    }

    /// Sum of outputs owned by `address`.
    pub fn paid_to(&self, address: &Address) -> Amount {
        self.outputs
            .iter()
            .filter(|o| &o.owner == address)
            .fold(0u64, |acc, o| acc.saturating_add(o.amount))
    }

    /// True if `address` sends, receives, or owns an output of this transaction.
    pub fn touches(&self, address: &Address) -> bool {
        &self.sender == address
            || &self.recipient == address
            || self.outputs.iter().any(|o| &o.owner == address)
    }

    /// Outpoints created by this transaction, in output order.
    pub fn created_outpoints(&self) -> impl Iterator<Item = (OutPoint, &TxOutput)> + '_ {
        self.outputs
            .iter()
            .enumerate()
            .map(move |(i, o)| (OutPoint::new(self.txid, i as u32), o))
    }

    /// Context-free structural checks. Signatures and UTXO state are checked elsewhere.
    pub fn check_structure(&self) -> Result<(), TransactionError> {
        if self.txid != self.compute_txid() {
            return Err(TransactionError::TxidMismatch);
        }
        if self.outputs.is_empty() {
            return Err(TransactionError::MissingOutputs);
        }
        if let Some(index) = self.outputs.iter().position(|o| o.amount == 0) {
            return Err(TransactionError::ZeroValueOutput { index });
        }
        if self.output_total().is_none() {
            return Err(TransactionError::ValueOverflow);
        }
        if self.is_coinbase() {
            return Ok(());
        }
        if self.inputs.is_empty() {
            return Err(TransactionError::MissingInputs);
        }
        let mut seen = HashSet::with_capacity(self.inputs.len());
        for input in &self.inputs {
            if !seen.insert(*input) {
                return Err(TransactionError::DuplicateInput(*input));
            }
        }
        let paid = self.paid_to(&self.recipient);
        if paid != self.amount {
            return Err(TransactionError::AmountMismatch {
                declared: self.amount,
                paid,
            });
        }
        Ok(())
    }
}

// =============================================================================
// CLUSTER B: THE CHAIN
// =============================================================================

/// Block header. `hash` covers every other field.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub index: u64,
    #[serde_as(as = "Hex")]
    pub previous_hash: Hash,
    pub timestamp: Timestamp,
    #[serde_as(as = "Hex")]
    pub merkle_root: Hash,
    /// Required leading zero bits of `hash`.
    pub difficulty: u32,
    pub nonce: u64,
    #[serde_as(as = "Hex")]
    pub miner_pubkey: PublicKey,
    #[serde_as(as = "Hex")]
    pub hash: Hash,
}

impl BlockHeader {
    /// Header bytes without the nonce. The nonce is appended last so the PoW
    /// search only re-hashes the tail.
    pub fn pow_prefix(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_DOMAIN.len() + HEADER_SIZE);
        buf.extend_from_slice(HEADER_DOMAIN);
        buf.extend_from_slice(&self.index.to_le_bytes());
        buf.extend_from_slice(&self.previous_hash);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.merkle_root);
        buf.extend_from_slice(&self.difficulty.to_le_bytes());
        buf.extend_from_slice(&self.miner_pubkey);
        buf
    }

    /// Hash of `prefix || nonce`.
    pub fn hash_for_nonce(prefix: &[u8], nonce: u64) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(prefix);
        hasher.update(nonce.to_le_bytes());
        hasher.finalize().into()
    }

    pub fn compute_hash(&self) -> Hash {
        Self::hash_for_nonce(&self.pow_prefix(), self.nonce)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

/// A block: header plus ordered transactions, coinbase first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Unmined block: merkle root filled in, nonce 0, hash computed.
    pub fn template(
        index: u64,
        previous_hash: Hash,
        timestamp: Timestamp,
        difficulty: u32,
        miner_pubkey: PublicKey,
        transactions: Vec<Transaction>,
    ) -> Self {
        let txids: Vec<Hash> = transactions.iter().map(|tx| tx.txid).collect();
        let mut header = BlockHeader {
            index,
            previous_hash,
            timestamp,
            merkle_root: merkle_root(&txids),
            difficulty,
            nonce: 0,
            miner_pubkey,
            hash: ZERO_HASH,
        };
        header.hash = header.compute_hash();
        Self {
            header,
            transactions,
        }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coinbase())
    }

    /// Non-coinbase transactions.
    pub fn user_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|tx| !tx.is_coinbase())
    }

    pub fn txids(&self) -> Vec<Hash> {
        self.transactions.iter().map(|tx| tx.txid).collect()
    }

    pub fn compute_merkle_root(&self) -> Hash {
        merkle_root(&self.txids())
    }

    pub fn serialized_size(&self) -> usize {
        HEADER_SIZE
            + self
                .transactions
                .iter()
                .map(Transaction::serialized_size)
                .sum::<usize>()
    }
}

/// Binary SHA-256 merkle root. Odd levels duplicate their last hash.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return ZERO_HASH;
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let right = pair.get(1).unwrap_or(&pair[0]);
            let mut hasher = Sha256::new();
            hasher.update(pair[0]);
            hasher.update(right);
            next.push(hasher.finalize().into());
        }
        level = next;
    }
    level[0]
}
