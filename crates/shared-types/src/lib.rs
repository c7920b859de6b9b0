//! # Shared Types Crate
//!
//! Ledger entities shared by every subsystem of the engine.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: transaction ids, block hashes and merkle roots are
//!   computed here and nowhere else, so every node derives bit-identical values.
//! - **Integer Amounts**: all values are base units (`1 coin = COIN units`).
//! - **Hex on the Wire**: byte arrays serialize as hex strings so persisted JSON
//!   blobs stay human-auditable.

pub mod entities;
pub mod errors;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
