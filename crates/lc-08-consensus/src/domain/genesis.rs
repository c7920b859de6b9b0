use crate::config::GenesisConfig;
use shared_types::{Block, Transaction, TxOutput, ZERO_HASH};

/// Deterministic genesis: one coinbase paying every allocation in order,
/// or no transactions at all when nothing is allocated.
pub fn build_genesis(config: &GenesisConfig) -> Block {
    let transactions = match config.allocations.split_first() {
        Some((first, rest)) => {
            let mut coinbase =
                Transaction::coinbase(0, first.address, first.amount, config.timestamp);
            coinbase
                .outputs
                .extend(rest.iter().map(|a| TxOutput::new(a.amount, a.address)));
            coinbase.seal();
            vec![coinbase]
        }
        None => Vec::new(),
    };
    Block::template(0, ZERO_HASH, config.timestamp, 0, [0; 32], transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisAllocation;

    fn config(amounts: &[u64]) -> GenesisConfig {
        GenesisConfig {
            timestamp: 1_700_000_000_000,
            allocations: amounts
                .iter()
                .enumerate()
                .map(|(i, amount)| GenesisAllocation {
                    address: [i as u8 + 1; 20],
                    amount: *amount,
                })
                .collect(),
        }
    }

    #[test]
    fn test_genesis_is_deterministic() {
        assert_eq!(build_genesis(&config(&[5, 7])), build_genesis(&config(&[5, 7])));
        assert_ne!(
            build_genesis(&config(&[5, 7])).hash(),
            build_genesis(&config(&[5, 8])).hash()
        );
    }

    #[test]
    fn test_allocations_become_outputs() {
        let genesis = build_genesis(&config(&[5, 7]));
        let coinbase = genesis.coinbase().unwrap();
        assert_eq!(coinbase.paid_to(&[1; 20]), 5);
        assert_eq!(coinbase.paid_to(&[2; 20]), 7);
        assert!(coinbase.check_structure().is_ok());
        assert_eq!(genesis.header.merkle_root, genesis.compute_merkle_root());
    }

    #[test]
    fn test_empty_genesis() {
        let genesis = build_genesis(&GenesisConfig::default());
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis.index(), 0);
    }
}
