use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_crypto::address_from_public_key;
use shared_types::{Address, PublicKey};

/// A voter in the finality overlay.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorIdentity {
    #[serde_as(as = "Hex")]
    pub address: Address,
    #[serde_as(as = "Hex")]
    pub public_key: PublicKey,
    pub voting_power: u64,
    /// Selection multiplier for rotation, 1 for a fresh validator.
    pub reputation: u64,
}

impl ValidatorIdentity {
    /// Identity whose address is derived from `public_key`.
    pub fn new(public_key: PublicKey, voting_power: u64) -> Self {
        Self {
            address: address_from_public_key(&public_key),
            public_key,
            voting_power,
            reputation: 1,
        }
    }

    pub fn with_reputation(mut self, reputation: u64) -> Self {
        self.reputation = reputation;
        self
    }
}
