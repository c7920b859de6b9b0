//! # Block Validation
//!
//! Context checks for one block against its parent. UTXO and nonce rules are
//! enforced afterwards by `StateManager::apply_block`, which is all or nothing.
//!
//! ## Checks (in order)
//!
//! 1. Index and parent link
//! 2. Merkle root, header hash, network difficulty and proof of work
//! 3. Timestamp not before the parent and not too far in the future
//! 4. Size and transaction count limits
//! 5. Coinbase first, tagged with the block height
//! 6. No repeated txid; every user transaction signature verifies
//! 7. Coinbase pays exactly reward plus declared fees

use crate::config::ChainConfig;
use crate::error::BlockValidationError;
use lc_17_block_production::{block_reward, check_header_pow};
use shared_crypto::verify_transaction;
use shared_types::{Amount, Block, BlockHeader, Timestamp};
use std::collections::HashSet;

#[derive(Clone, Debug)]
pub struct BlockValidator {
    difficulty: u32,
    max_block_size_bytes: usize,
    max_transactions: usize,
    max_future_drift_ms: u64,
}

impl BlockValidator {
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            difficulty: config.production.difficulty,
            max_block_size_bytes: config.production.max_block_size_bytes,
            max_transactions: config.production.max_transactions_per_block,
            max_future_drift_ms: config.max_future_drift_ms,
        }
    }

    pub fn check_block(
        &self,
        block: &Block,
        parent: &BlockHeader,
        now: Timestamp,
    ) -> Result<(), BlockValidationError> {
        let header = &block.header;

        let expected = parent.index + 1;
        if header.index != expected {
            return Err(BlockValidationError::IndexMismatch {
                expected,
                actual: header.index,
            });
        }
        if header.previous_hash != parent.hash {
            return Err(BlockValidationError::BrokenLink { parent: parent.hash });
        }

        if header.merkle_root != block.compute_merkle_root() {
            return Err(BlockValidationError::MerkleMismatch);
        }
        if header.hash != header.compute_hash() {
            return Err(BlockValidationError::HashMismatch);
        }
        if header.difficulty != self.difficulty {
            return Err(BlockValidationError::DifficultyMismatch {
                expected: self.difficulty,
                actual: header.difficulty,
            });
        }
        if !check_header_pow(header) {
            return Err(BlockValidationError::InsufficientWork {
                difficulty: header.difficulty,
            });
        }

        if header.timestamp < parent.timestamp {
            return Err(BlockValidationError::TimestampRegression {
                block: header.timestamp,
                parent: parent.timestamp,
            });
        }
        if header.timestamp > now.saturating_add(self.max_future_drift_ms) {
            return Err(BlockValidationError::TimestampInFuture {
                block: header.timestamp,
                now,
            });
        }

        let bytes = block.serialized_size();
        if bytes > self.max_block_size_bytes {
            return Err(BlockValidationError::Oversized {
                bytes,
                limit: self.max_block_size_bytes,
            });
        }
        let count = block.transactions.len().saturating_sub(1);
        if count > self.max_transactions {
            return Err(BlockValidationError::TooManyTransactions {
                count,
                limit: self.max_transactions,
            });
        }

        let coinbase = block.coinbase().ok_or(BlockValidationError::MissingCoinbase)?;
        if coinbase.nonce != header.index {
            return Err(BlockValidationError::CoinbaseHeight {
                expected: header.index,
                actual: coinbase.nonce,
            });
        }

        let mut seen = HashSet::with_capacity(block.transactions.len());
        let mut fees: Amount = 0;
        for tx in &block.transactions {
            if !seen.insert(tx.txid) {
                return Err(BlockValidationError::DuplicateTransaction(tx.txid));
            }
        }
        for tx in block.user_transactions() {
            verify_transaction(tx).map_err(|_| BlockValidationError::InvalidSignature { txid: tx.txid })?;
            fees = fees
                .checked_add(tx.fee)
                .ok_or(BlockValidationError::FeeOverflow)?;
        }

        let expected = block_reward(header.index)
            .checked_add(fees)
            .ok_or(BlockValidationError::FeeOverflow)?;
        let actual = coinbase
            .output_total()
            .ok_or(BlockValidationError::FeeOverflow)?;
        if actual != expected {
            return Err(BlockValidationError::CoinbaseAmount { expected, actual });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::{sign_transaction, Ed25519KeyPair};
    use shared_types::{OutPoint, Transaction, TxOutput, COIN, ZERO_HASH};

    const MINER: [u8; 20] = [0x33; 20];

    fn validator() -> BlockValidator {
        BlockValidator::new(&ChainConfig::for_testing())
    }

    fn parent() -> BlockHeader {
        Block::template(0, ZERO_HASH, 100, 0, [0; 32], vec![]).header
    }

    fn child(parent: &BlockHeader, mut transactions: Vec<Transaction>, coinbase_value: Amount) -> Block {
        let coinbase = Transaction::coinbase(parent.index + 1, MINER, coinbase_value, 200);
        transactions.insert(0, coinbase);
        Block::template(parent.index + 1, parent.hash, 200, 0, [1; 32], transactions)
    }

    fn signed_transfer(fee: Amount) -> Transaction {
        let keys = Ed25519KeyPair::from_seed([4; 32]);
        let mut tx = Transaction {
            sender: keys.address(),
            recipient: MINER,
            amount: COIN,
            fee,
            nonce: 0,
            inputs: vec![OutPoint::new([9; 32], 0)],
            outputs: vec![TxOutput::new(COIN, MINER)],
            signature: [0; 64],
            public_key: [0; 32],
            timestamp: 0,
            txid: ZERO_HASH,
        };
        sign_transaction(&mut tx, &keys);
        tx
    }

    // =========================================================================
    // HEADER TESTS
    // =========================================================================

    #[test]
    fn test_valid_child_passes() {
        let parent = parent();
        let block = child(&parent, vec![signed_transfer(500)], block_reward(1) + 500);
        assert_eq!(validator().check_block(&block, &parent, 1_000), Ok(()));
    }

    #[test]
    fn test_link_and_index() {
        let parent = parent();
        let mut block = child(&parent, vec![], block_reward(1));
        block.header.previous_hash = [7; 32];
        block.header.hash = block.header.compute_hash();
        assert!(matches!(
            validator().check_block(&block, &parent, 1_000),
            Err(BlockValidationError::BrokenLink { .. })
        ));

        let mut block = child(&parent, vec![], block_reward(1));
        block.header.index = 5;
        assert!(matches!(
            validator().check_block(&block, &parent, 1_000),
            Err(BlockValidationError::IndexMismatch { expected: 1, actual: 5 })
        ));
    }

    #[test]
    fn test_tampered_body_and_header() {
        let parent = parent();
        let mut block = child(&parent, vec![signed_transfer(500)], block_reward(1) + 500);
        block.transactions.pop();
        assert_eq!(
            validator().check_block(&block, &parent, 1_000),
            Err(BlockValidationError::MerkleMismatch)
        );

        let mut block = child(&parent, vec![], block_reward(1));
        block.header.nonce = 99;
        assert_eq!(
            validator().check_block(&block, &parent, 1_000),
            Err(BlockValidationError::HashMismatch)
        );
    }

    #[test]
    fn test_wrong_difficulty_rejected() {
        let parent = parent();
        let coinbase = Transaction::coinbase(1, MINER, block_reward(1), 200);
        let block = Block::template(1, parent.hash, 200, 3, [1; 32], vec![coinbase]);
        assert_eq!(
            validator().check_block(&block, &parent, 1_000),
            Err(BlockValidationError::DifficultyMismatch {
                expected: 0,
                actual: 3
            })
        );
    }

    #[test]
    fn test_timestamps() {
        let parent = parent();
        let coinbase = Transaction::coinbase(1, MINER, block_reward(1), 50);
        let early = Block::template(1, parent.hash, 50, 0, [1; 32], vec![coinbase]);
        assert!(matches!(
            validator().check_block(&early, &parent, 1_000),
            Err(BlockValidationError::TimestampRegression { .. })
        ));

        let far = u64::MAX / 2;
        let coinbase = Transaction::coinbase(1, MINER, block_reward(1), far);
        let future = Block::template(1, parent.hash, far, 0, [1; 32], vec![coinbase]);
        assert!(matches!(
            validator().check_block(&future, &parent, 1_000),
            Err(BlockValidationError::TimestampInFuture { .. })
        ));
    }

    // =========================================================================
    // BODY TESTS
    // =========================================================================

    #[test]
    fn test_coinbase_must_match_reward_plus_fees() {
        let parent = parent();
        let greedy = child(&parent, vec![signed_transfer(500)], block_reward(1) + 501);
        assert_eq!(
            validator().check_block(&greedy, &parent, 1_000),
            Err(BlockValidationError::CoinbaseAmount {
                expected: block_reward(1) + 500,
                actual: block_reward(1) + 501
            })
        );
    }

    #[test]
    fn test_missing_coinbase() {
        let parent = parent();
        let block = Block::template(1, parent.hash, 200, 0, [1; 32], vec![signed_transfer(1)]);
        assert_eq!(
            validator().check_block(&block, &parent, 1_000),
            Err(BlockValidationError::MissingCoinbase)
        );
    }

    #[test]
    fn test_forged_signature_rejected() {
        let parent = parent();
        let mut tx = signed_transfer(500);
        tx.signature[0] ^= 0xFF;
        let block = child(&parent, vec![tx], block_reward(1) + 500);
        assert!(matches!(
            validator().check_block(&block, &parent, 1_000),
            Err(BlockValidationError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_duplicate_transaction_rejected() {
        let parent = parent();
        let tx = signed_transfer(500);
        let block = child(&parent, vec![tx.clone(), tx], block_reward(1) + 1_000);
        assert!(matches!(
            validator().check_block(&block, &parent, 1_000),
            Err(BlockValidationError::DuplicateTransaction(_))
        ));
    }
}
