//! # Durability
//!
//! A node on disk restarts with the chain, balances, nonces and finality it
//! had when it stopped. Two processes never share a data directory.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use node_runtime::{Node, NodeConfig};
    use shared_types::{Address, COIN};

    const RECIPIENT: Address = [0xD1; 20];

    fn on_disk(seed: u8, dir: &tempfile::TempDir) -> NodeConfig {
        NodeConfig {
            data_dir: dir.path().to_path_buf(),
            ..node_config(seed, &[seed])
        }
    }

    #[test]
    fn test_restart_restores_ledger_and_finality() {
        let dir = tempfile::tempdir().unwrap();
        let config = on_disk(50, &dir);

        let (snapshot, tip) = {
            let node = Node::open(config.clone()).unwrap();
            node.chain()
                .submit_transaction(transfer(0, RECIPIENT, COIN, COIN / 100, 0))
                .unwrap();
            for _ in 0..3 {
                node.mine_once().unwrap();
            }
            assert_eq!(node.finality().get_highest_finalized_height(), Some(3));
            (node.chain().compute_state_snapshot(), node.chain().tip_hash())
        };

        let node = Node::open(config).unwrap();
        let chain = node.chain();
        assert_eq!(chain.height(), 3);
        assert_eq!(chain.tip_hash(), tip);
        assert_eq!(chain.compute_state_snapshot(), snapshot);
        assert_eq!(chain.get_balance(&RECIPIENT), COIN);
        assert_eq!(chain.expected_nonce(&alice().address()), 1);
        assert_eq!(node.finality().highest_finalized(), Some((3, tip)));

        // Picks up mining and voting where it left off.
        let next = node.mine_once().unwrap();
        assert_eq!(next.index(), 4);
        assert!(node.finality().is_block_finalized(&next.hash()));
    }

    #[test]
    fn test_mempool_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let config = on_disk(51, &dir);
        {
            let node = Node::open(config.clone()).unwrap();
            node.chain()
                .submit_transaction(transfer(0, RECIPIENT, COIN, COIN / 100, 0))
                .unwrap();
            assert_eq!(node.chain().mempool_len(), 1);
        }

        let node = Node::open(config).unwrap();
        assert_eq!(node.chain().mempool_len(), 0);
        assert_eq!(node.chain().height(), 0);
        // The reserved input is free again after the restart.
        node.chain()
            .submit_transaction(transfer(0, RECIPIENT, COIN, COIN / 100, 0))
            .unwrap();
    }

    #[test]
    fn test_data_directory_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let config = on_disk(52, &dir);

        let first = Node::open(config.clone()).unwrap();
        assert!(Node::open(config.clone()).is_err());

        drop(first);
        assert!(Node::open(config).is_ok());
    }
}
