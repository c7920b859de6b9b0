//! # lc-06-mempool
//!
//! Admission control for pending transactions.
//!
//! ## Admission Order
//!
//! | Step | Check | Rejection |
//! |------|-------|-----------|
//! | 0 | Sender ban | `Banned` |
//! | 1 | Duplicate txid | `Duplicate` |
//! | 2 | Structure and signature | `Invalid` |
//! | 3 | Nonce against confirmed and pending | `NonceReplay`, `NonceGap` |
//! | 4 | Inputs exist, unreserved, owned, cover outputs plus fee | `DoubleSpend`, `InsufficientFunds`, `Invalid` |
//! | 5 | Fee-rate floor | `LowFee` |
//! | 6 | Per-sender cap | `SenderLimit` |
//! | 7 | Capacity, evicting strictly cheaper entries | `PoolFull` |
//!
//! Failures of steps 2 to 4 count toward the sender's ban window.
//!
//! ## Outbound Dependencies
//!
//! | Subsystem | Trait | Purpose |
//! |-----------|-------|---------|
//! | 4 (State Management) | `StateProvider` | Nonces, input checks, reservations |

pub mod adapters;
pub mod domain;
pub mod ports;

pub use domain::*;
pub use ports::StateProvider;
