//! # lc-17-block-production
//!
//! Block assembly and proof-of-work mining.
//!
//! ## Pipeline
//!
//! ```text
//! mempool ──select──→ template (coinbase + txs + merkle root)
//!                         │
//!                         └──PoW (no ledger lock)──→ mined block ──→ consensus commit
//! ```
//!
//! ## Selection Rules
//!
//! - Highest fee-rate first across senders
//! - Within a sender, strictly consecutive nonces from the confirmed next nonce
//! - Stop at the transaction count or block byte cap
//!
//! ## Reward
//!
//! `50 coins >> (height / 210_000)`, zero after 64 halvings, plus collected fees.

pub mod config;
pub mod domain;
pub mod error;

pub use config::{BlockProductionConfig, MAX_DIFFICULTY};
pub use domain::*;
pub use error::{BlockProductionError, Result};
