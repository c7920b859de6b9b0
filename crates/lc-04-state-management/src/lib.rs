//! # lc-04-state-management
//!
//! Confirmed ledger state for the engine.
//!
//! ## Role in System
//!
//! - **UTXO set**: the only place outputs are created or consumed
//! - **Nonce tracker**: per-sender replay protection
//! - **Delta log**: per-block undo records for reorgs
//!
//! ## Domain Invariants
//!
//! | ID | Invariant |
//! |----|-----------|
//! | 1 | An output is never both unspent and consumed by two confirmed transactions |
//! | 2 | A sender's confirmed nonces are exactly `0..expected_nonce` |
//! | 3 | `apply_block` either applies the whole block or changes nothing |
//! | 4 | `rollback_block` restores the exact pre-block digests |

pub mod domain;
pub mod service;

pub use domain::*;
pub use service::{StateManager, StateSnapshot, DEFAULT_DELTA_RETENTION};
