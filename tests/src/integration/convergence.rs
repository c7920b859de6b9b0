//! # Convergence
//!
//! Independently mining nodes agree on one chain and one state after a
//! sync round, whichever node they sync from.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use lc_08_consensus::{LocalPeer, PeerClient};
    use node_runtime::{Node, NodeConfig, NodeRuntime};
    use shared_types::COIN;
    use std::sync::Arc;
    use std::time::Duration;

    fn peers_of(nodes: &[Arc<Node>], except: usize) -> Vec<Arc<dyn PeerClient>> {
        nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != except)
            .map(|(i, n)| {
                Arc::new(LocalPeer::new(format!("node-{i}"), Arc::clone(n.chain())))
                    as Arc<dyn PeerClient>
            })
            .collect()
    }

    // =========================================================================
    // SYNC ROUNDS
    // =========================================================================

    #[tokio::test]
    async fn test_three_nodes_converge_on_longest_chain() {
        let time = clock();
        let nodes = network(&[10, 11, 12], time);
        nodes[0]
            .chain()
            .submit_transaction(transfer(0, [0xEE; 20], COIN, 1_000, 0))
            .unwrap();
        for (node, blocks) in nodes.iter().zip([2, 5, 3]) {
            for _ in 0..blocks {
                node.mine_once().unwrap();
            }
        }

        for i in 0..nodes.len() {
            let report = nodes[i].chain().sync_with_network(&peers_of(&nodes, i)).await;
            assert_eq!(report.responded, 2);
            if i != 1 {
                assert_eq!(report.adopted.map(|s| s.new_height), Some(5));
            }
        }

        let tip = nodes[1].chain().tip_hash();
        let snapshot = nodes[1].chain().compute_state_snapshot();
        for node in &nodes {
            assert_eq!(node.chain().tip_hash(), tip);
            assert_eq!(node.chain().compute_state_snapshot(), snapshot);
        }

        // Node 0's transfer lost its block and waits in the mempool again.
        assert_eq!(nodes[0].chain().mempool_len(), 1);
        assert_eq!(nodes[0].chain().get_balance(&[0xEE; 20]), 0);
    }

    #[tokio::test]
    async fn test_runtimes_follow_a_mining_leader() {
        let time = clock();
        let seeds = [20, 21, 22];
        let leader = open_node(node_config(20, &seeds), time.clone());
        let followers: Vec<Arc<Node>> = seeds[1..]
            .iter()
            .map(|seed| {
                let config = NodeConfig {
                    mining_enabled: false,
                    ..node_config(*seed, &seeds)
                };
                open_node(config, time.clone())
            })
            .collect();

        let mut leader_runtime = NodeRuntime::new(Arc::clone(&leader));
        leader_runtime.start(Vec::new());
        let mut runtimes = Vec::new();
        for follower in &followers {
            let peer: Arc<dyn PeerClient> =
                Arc::new(LocalPeer::new("leader", Arc::clone(leader.chain())));
            let mut runtime = NodeRuntime::new(Arc::clone(follower));
            runtime.start(vec![peer]);
            runtimes.push(runtime);
        }

        assert!(
            eventually(|| leader.chain().height() >= 4).await,
            "leader did not mine"
        );
        leader_runtime.shutdown().await;
        let tip = leader.chain().tip_hash();

        let converged = eventually(|| followers.iter().all(|f| f.chain().tip_hash() == tip)).await;
        for runtime in runtimes {
            runtime.shutdown().await;
        }
        assert!(converged, "followers did not converge");
        for follower in &followers {
            assert_eq!(follower.chain().height(), leader.chain().height());
            assert_eq!(follower.broadcaster().blocks_sent(), 0);
        }
    }

    async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..300 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}
