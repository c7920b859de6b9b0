//! # Finality (lc-09)
//!
//! BFT overlay on top of the PoW chain. Validators sign votes for block
//! headers; a block whose tally exceeds the configured fraction of total
//! voting power gets a `FinalityCertificate` and can never be reorganized out.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Strict Quorum | Finalize only when `power * den > total * num` |
//! | 2 | One Vote Per Validator | A voter is counted once per `(height, hash)` |
//! | 3 | Monotonic Finality | The highest finalized height never decreases |
//! | 4 | Durable Finality | Certificates are persisted before they take effect |
//! | 5 | Slashable Equivocation | A second hash at one height is dropped and slashed |
//!
//! ## Crate Structure
//!
//! - `domain/` - Votes, detector, slashing, tombstones, validator rotation
//! - `service.rs` - `FinalityManager`

pub mod config;
pub mod domain;
pub mod error;
pub mod service;

pub use config::{FinalityConfig, SlashingConfig, ValidatorSetConfig};
pub use domain::*;
pub use error::{FinalityError, FinalityResult};
pub use service::{FinalityManager, VoteOutcome};
