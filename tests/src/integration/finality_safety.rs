//! # Finality Safety
//!
//! A finalized block is never reorganized out, however long the competing
//! chain. Equivocating validators lose their vote, get slashed by exactly
//! the configured percentage, and are tombstoned at the threshold.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use lc_08_consensus::{ChainError, ChainManager, LocalPeer, PeerClient};
    use lc_02_block_storage::{ChainStore, FileBlobStore};
    use lc_09_finality::{sign_vote, FinalityError, FinalityManager, MisbehaviorType, VoteOutcome};
    use shared_types::{Address, Block, BlockHeader};
    use std::sync::Arc;

    const MINER_A: Address = [0xA1; 20];
    const MINER_B: Address = [0xB1; 20];

    fn mine(chain: &ChainManager, miner: Address, seed: u8) -> Block {
        chain
            .mine_pending_transactions(miner, Some(&key(seed)))
            .unwrap()
    }

    fn vote(
        finality: &FinalityManager,
        validators: &Validators,
        index: usize,
        header: &BlockHeader,
    ) -> Result<VoteOutcome, FinalityError> {
        let keys = &validators.keys[index];
        finality.record_vote(&keys.address(), header, &sign_vote(keys, header))
    }

    /// Four validators with power 10: three votes (30 of 40) pass 2/3.
    fn finalize(finality: &FinalityManager, validators: &Validators, block: &Block) {
        for index in 0..2 {
            assert!(matches!(
                vote(finality, validators, index, &block.header),
                Ok(VoteOutcome::Counted { .. })
            ));
        }
        assert!(matches!(
            vote(finality, validators, 2, &block.header),
            Ok(VoteOutcome::Finalized(_))
        ));
    }

    // =========================================================================
    // FINALITY VETO
    // =========================================================================

    #[test]
    fn test_longer_fork_cannot_revert_finalized_block() {
        let time = clock();
        let validators = Validators::new(31..=34, time.clone());
        let finality = validators.finality(memory_store(), time.clone());
        let honest = chain_with_finality(memory_store(), time.clone(), finality.clone());
        let attacker = chain(memory_store(), time);

        mine(&honest, MINER_A, 9);
        let finalized = mine(&honest, MINER_A, 9);
        finalize(&finality, &validators, &finalized);
        for _ in 0..10 {
            mine(&attacker, MINER_B, 8);
        }

        assert_eq!(
            honest.replace_chain(attacker.blocks()),
            Err(ChainError::FinalityViolation {
                height: 2,
                finalized: finalized.hash()
            })
        );
        assert_eq!(honest.height(), 2);
        assert_eq!(honest.tip_hash(), finalized.hash());
    }

    #[test]
    fn test_fork_above_finality_still_reorganizes() {
        let time = clock();
        let validators = Validators::new(31..=34, time.clone());
        let finality = validators.finality(memory_store(), time.clone());
        let honest = chain_with_finality(memory_store(), time.clone(), finality.clone());
        let rival = chain(memory_store(), time);

        let finalized = mine(&honest, MINER_A, 9);
        finalize(&finality, &validators, &finalized);
        mine(&honest, MINER_A, 9);

        rival.accept_peer_block(finalized.clone()).unwrap();
        for _ in 0..3 {
            rival.mining_control().resume();
            mine(&rival, MINER_B, 8);
        }

        let summary = honest.replace_chain(rival.blocks()).unwrap();
        assert_eq!(summary.common_ancestor, 1);
        assert_eq!(summary.rolled_back, 1);
        assert!(finality.is_block_finalized(&honest.block_at(1).unwrap().hash()));
    }

    #[tokio::test]
    async fn test_sync_skips_peer_that_rewrites_finality() {
        let time = clock();
        let validators = Validators::new(31..=34, time.clone());
        let finality = validators.finality(memory_store(), time.clone());
        let honest = chain_with_finality(memory_store(), time.clone(), finality.clone());
        let attacker = Arc::new(chain(memory_store(), time));

        let finalized = mine(&honest, MINER_A, 9);
        finalize(&finality, &validators, &finalized);
        for _ in 0..4 {
            mine(&attacker, MINER_B, 8);
        }

        let peers: Vec<Arc<dyn PeerClient>> = vec![Arc::new(LocalPeer::new("attacker", attacker))];
        let report = honest.sync_with_network(&peers).await;
        assert_eq!(report.ahead, 1);
        assert!(report.adopted.is_none());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(honest.tip_hash(), finalized.hash());
    }

    #[test]
    fn test_finality_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let time = clock();
        let validators = Validators::new(31..=34, time.clone());
        let attacker = chain(memory_store(), time.clone());
        for _ in 0..5 {
            mine(&attacker, MINER_B, 8);
        }

        let finalized = {
            let store = ChainStore::new(Arc::new(FileBlobStore::open(dir.path()).unwrap()));
            let finality = validators.finality(store.clone(), time.clone());
            let honest = chain_with_finality(store, time.clone(), finality.clone());
            let block = mine(&honest, MINER_A, 9);
            finalize(&finality, &validators, &block);
            block
        };

        let store = ChainStore::new(Arc::new(FileBlobStore::open(dir.path()).unwrap()));
        let finality = validators.finality(store.clone(), time.clone());
        assert_eq!(finality.highest_finalized(), Some((1, finalized.hash())));
        let honest = chain_with_finality(store, time, finality);
        assert!(matches!(
            honest.replace_chain(attacker.blocks()),
            Err(ChainError::FinalityViolation { height: 1, .. })
        ));
    }

    // =========================================================================
    // DOUBLE SIGNING
    // =========================================================================

    /// Two different blocks at height 1 from two miners.
    fn conflicting_blocks() -> (Block, Block) {
        let time = clock();
        let a = chain(memory_store(), time.clone());
        let b = chain(memory_store(), time);
        (mine(&a, MINER_A, 9), mine(&b, MINER_B, 8))
    }

    #[test]
    fn test_double_sign_is_dropped_and_slashed_exactly() {
        let time = clock();
        let validators = Validators::new(31..=34, time.clone());
        let finality = validators.finality(memory_store(), time);
        let (first, second) = conflicting_blocks();
        let offender = validators.keys[0].address();

        vote(&finality, &validators, 0, &first.header).unwrap();
        assert_eq!(
            vote(&finality, &validators, 0, &second.header),
            Err(FinalityError::DoubleSign {
                validator: offender,
                height: 1
            })
        );

        let records = validators.slashing.records_for(&offender);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.misbehavior, MisbehaviorType::DoubleSigning);
        assert_eq!(record.stake_before, VALIDATOR_STAKE);
        assert_eq!(record.penalty, VALIDATOR_STAKE / 10);
        assert_eq!(record.stake_after, VALIDATOR_STAKE - VALIDATOR_STAKE / 10);
        assert_eq!(validators.set.stake_of(&offender), Some(record.stake_after));
        assert!(!record.tombstoned);

        // Gossip redelivers the conflicting vote: still refused, never
        // punished twice.
        assert!(matches!(
            vote(&finality, &validators, 0, &second.header),
            Err(FinalityError::DoubleSign { .. })
        ));
        assert_eq!(validators.slashing.records_for(&offender).len(), 1);
        assert_eq!(validators.set.stake_of(&offender), Some(record.stake_after));

        // Re-sending the original vote is not equivocation.
        assert_eq!(
            vote(&finality, &validators, 0, &first.header),
            Ok(VoteOutcome::AlreadyCounted)
        );
        assert_eq!(validators.slashing.total_slashings(), 1);

        // The conflicting vote was never tallied.
        for index in 1..3 {
            vote(&finality, &validators, index, &second.header).unwrap();
        }
        assert!(!finality.is_block_finalized(&second.hash()));
    }

    #[test]
    fn test_repeat_offender_is_tombstoned_everywhere() {
        let time = clock();
        let validators = Validators::new(31..=34, time.clone());
        let finality = validators.finality(memory_store(), time.clone());
        let offender = validators.keys[0].address();

        // Two equivocations reach the test threshold of 2.
        let (first, second) = conflicting_blocks();
        vote(&finality, &validators, 0, &first.header).unwrap();
        vote(&finality, &validators, 0, &second.header).unwrap_err();

        let a = chain(memory_store(), time.clone());
        let b = chain(memory_store(), time);
        for _ in 0..2 {
            mine(&a, MINER_A, 9);
            mine(&b, MINER_B, 8);
        }
        let (third, fourth) = (a.block_at(2).unwrap(), b.block_at(2).unwrap());
        vote(&finality, &validators, 0, &third.header).unwrap();
        vote(&finality, &validators, 0, &fourth.header).unwrap_err();

        let records = validators.slashing.records_for(&offender);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].stake_before, 900);
        assert_eq!(records[1].stake_after, 810);
        assert!(records[1].tombstoned);
        assert!(validators.slashing.is_tombstoned(&offender));
        assert_eq!(validators.set.stake_of(&offender), None);
        assert!(!finality.is_validator(&offender));
        assert_eq!(finality.total_voting_power(), 30);

        // The three honest validators hold all of the shrunk set.
        let (fresh, _) = conflicting_blocks();
        for index in 1..4 {
            vote(&finality, &validators, index, &fresh.header).unwrap();
        }
        assert!(finality.is_block_finalized(&fresh.hash()));
    }
}
