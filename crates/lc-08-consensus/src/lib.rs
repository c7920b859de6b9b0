//! # Consensus (lc-08)
//!
//! The `ChainManager` owns the canonical chain. It validates and applies
//! blocks, mines on top of the tip, picks between competing chains and
//! rebuilds itself from storage after a restart.
//!
//! ## Fork Choice
//!
//! | Rule | Outcome |
//! |------|---------|
//! | Candidate has a different genesis | `InvalidBlock { height: 0 }` |
//! | Candidate not strictly longer | `NotLonger` |
//! | Candidate changes a finalized block | `FinalityViolation` |
//! | Any candidate block fails validation | `InvalidBlock`, state untouched |
//! | Otherwise | Adopted, orphans offered back to the mempool |
//!
//! ## Outbound Dependencies
//!
//! | Subsystem | Type | Purpose |
//! |-----------|------|---------|
//! | 2 (Block Storage) | `ChainStore` | Blocks and checkpoints |
//! | 4 (State Management) | `StateManager` | UTXO set, nonces, delta log |
//! | 6 (Mempool) | `TransactionPool` | Pending transactions |
//! | 9 (Finality) | `FinalityManager` | Finality veto |
//! | 17 (Block Production) | `BlockAssembler`, `PowMiner` | Templates and nonce search |
//! | - | `PeerClient`, `Broadcaster` | Network edge |

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
mod recovery;
pub mod service;

pub use adapters::LocalPeer;
pub use config::{ChainConfig, GenesisAllocation, GenesisConfig};
pub use domain::*;
pub use error::{BlockValidationError, ChainError, ChainResult};
pub use ports::{Broadcaster, ChainInfo, PeerClient};
pub use service::{ChainDependencies, ChainManager, LedgerState, SyncReport};
