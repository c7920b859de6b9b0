//! # Mempool Flows
//!
//! Transactions submitted to a running node, from admission through
//! inclusion. Covers nonce ordering, sender bans, forgeries and repeated inputs.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use lc_06_mempool::{Reject, TxStatus};
    use lc_08_consensus::ChainError;
    use lc_09_finality::{sign_vote, VoteOutcome};
    use lc_17_block_production::block_reward;
    use shared_types::{Address, Hash, COIN};

    const RECIPIENT: Address = [0x5E; 20];
    const FEE: u64 = COIN / 100;

    // =========================================================================
    // TRANSFERS
    // =========================================================================

    #[test]
    fn test_transfer_is_mined_and_finalized() {
        let time = clock();
        let node = node(40, time);
        let chain = node.chain();

        let txid = chain
            .submit_transaction(transfer(0, RECIPIENT, COIN, FEE, 0))
            .unwrap();
        assert_eq!(chain.pending_transactions().len(), 1);
        assert_eq!(node.broadcaster().transactions_sent(), 1);

        let block = node.mine_once().unwrap();
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(chain.get_balance(&RECIPIENT), COIN);
        assert_eq!(
            chain.get_balance(&alice().address()),
            3 * GENESIS_OUTPUT - COIN - FEE
        );
        assert_eq!(chain.get_balance(&node.address()), block_reward(1) + FEE);
        assert_eq!(chain.transaction_status(&txid), Some(TxStatus::Included));
        assert!(node.finality().is_block_finalized(&block.hash()));

        let history = chain.get_transaction_history_window(&RECIPIENT, 10, 0);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transaction.txid, txid);
        assert_eq!(history[0].height, 1);
        assert_eq!(history[0].block_hash, block.hash());
    }

    #[test]
    fn test_out_of_order_nonces_are_mined_in_order() {
        let time = clock();
        let node = node(41, time);
        let chain = node.chain();

        let third = chain
            .submit_transaction(transfer(2, RECIPIENT, COIN, FEE, 2))
            .unwrap();
        let first = chain
            .submit_transaction(transfer(0, RECIPIENT, COIN, FEE, 0))
            .unwrap();
        let second = chain
            .submit_transaction(transfer(1, RECIPIENT, COIN, FEE, 1))
            .unwrap();

        let block = node.mine_once().unwrap();
        let mined: Vec<Hash> = block.user_transactions().map(|tx| tx.txid).collect();
        assert_eq!(mined, vec![first, second, third]);
        assert_eq!(chain.expected_nonce(&alice().address()), 3);
        assert_eq!(chain.get_balance(&RECIPIENT), 3 * COIN);
        assert_eq!(chain.mempool_len(), 0);
    }

    // =========================================================================
    // BANS
    // =========================================================================

    #[test]
    fn test_forgeries_do_not_ban_the_named_sender() {
        let time = clock();
        let node = node(42, time);
        let chain = node.chain();

        // Anyone can put alice's address on a transaction; only her key can
        // make it verify.
        let mut forged = transfer(1, RECIPIENT, COIN, FEE, 0);
        forged.signature[0] ^= 0xFF;
        for _ in 0..10 {
            assert!(matches!(
                chain.submit_transaction(forged.clone()),
                Err(ChainError::Admission(Reject::Invalid(_)))
            ));
        }

        let counters = chain.mempool_counters();
        assert_eq!(counters.rejected_invalid_total, 10);
        assert_eq!(counters.bans_total, 0);

        let honest = transfer(0, RECIPIENT, COIN, FEE, 0);
        let txid = honest.txid;
        assert_eq!(chain.submit_transaction(honest), Ok(txid));
        assert_eq!(chain.transaction_status(&txid), Some(TxStatus::Pending));
    }

    #[test]
    fn test_repeated_signed_invalid_spends_ban_the_sender() {
        let time = clock();
        let node = node(46, time.clone());
        let chain = node.chain();

        // Signed by alice, spending outputs that do not exist.
        for vout in 10..14 {
            assert!(matches!(
                chain.submit_transaction(transfer(vout, RECIPIENT, COIN, FEE, 0)),
                Err(ChainError::Admission(Reject::DoubleSpend(_)))
            ));
        }

        let honest = transfer(0, RECIPIENT, COIN, FEE, 0);
        let txid = honest.txid;
        assert_eq!(
            chain.submit_transaction(honest.clone()),
            Err(ChainError::Admission(Reject::Banned {
                until: START_TIME + 30_000
            }))
        );
        assert_eq!(chain.transaction_status(&txid), Some(TxStatus::RejectedBanned));

        let counters = chain.mempool_counters();
        assert_eq!(counters.rejected_invalid_total, 4);
        assert_eq!(counters.rejected_banned_total, 1);
        assert_eq!(counters.bans_total, 1);
        assert_eq!(counters.admitted_total, 0);

        time.advance(30_000);
        assert_eq!(chain.submit_transaction(honest), Ok(txid));
        assert_eq!(chain.transaction_status(&txid), Some(TxStatus::Pending));
    }

    #[test]
    fn test_spent_input_cannot_be_spent_again() {
        let time = clock();
        let node = node(43, time);
        let chain = node.chain();

        chain
            .submit_transaction(transfer(0, RECIPIENT, COIN, FEE, 0))
            .unwrap();
        assert!(matches!(
            chain.submit_transaction(transfer(0, [0x66; 20], COIN, FEE, 1)),
            Err(ChainError::Admission(Reject::DoubleSpend(_)))
        ));

        node.mine_once().unwrap();
        assert!(matches!(
            chain.submit_transaction(transfer(0, [0x66; 20], COIN, FEE, 1)),
            Err(ChainError::Admission(_))
        ));
        assert_eq!(chain.get_balance(&[0x66; 20]), 0);
    }

    // =========================================================================
    // IDEMPOTENCE
    // =========================================================================

    #[test]
    fn test_repeated_inputs_change_nothing() {
        let time = clock();
        let miner = node(44, time.clone());
        let follower = node(45, time);

        let tx = transfer(0, RECIPIENT, COIN, FEE, 0);
        let txid = miner.chain().submit_transaction(tx.clone()).unwrap();
        assert_eq!(
            miner.chain().submit_transaction(tx),
            Err(ChainError::Admission(Reject::Duplicate(txid)))
        );

        let block = miner.mine_once().unwrap();
        assert!(follower.chain().accept_peer_block(block.clone()).unwrap());
        assert!(!follower.chain().accept_peer_block(block.clone()).unwrap());
        assert_eq!(follower.chain().height(), 1);
        assert_eq!(follower.chain().get_balance(&RECIPIENT), COIN);

        let blocks = miner.chain().blocks();
        assert_eq!(
            follower.chain().replace_chain(blocks.clone()),
            Err(ChainError::NotLonger {
                candidate: blocks.len(),
                current: blocks.len()
            })
        );
        assert_eq!(
            follower.chain().compute_state_snapshot(),
            miner.chain().compute_state_snapshot()
        );

        // The miner already voted at height 1 and finalized it.
        assert!(miner.vote_for(&block).is_none());
        let keys = key(44);
        assert_eq!(
            miner
                .finality()
                .record_vote(&keys.address(), &block.header, &sign_vote(&keys, &block.header)),
            Ok(VoteOutcome::AlreadyFinalized)
        );
        assert_eq!(miner.slashing().total_slashings(), 0);
    }
}
