//! # Ledger-Core Test Suite
//!
//! Cross-crate flows that no single crate can test alone.
//!
//! ## Structure
//!
//! ```text
//! tests/src/integration/
//! ├── fixtures.rs         # Shared genesis, keys, transfers, node builders
//! ├── convergence.rs      # Nodes agree after sync
//! ├── finality_safety.rs  # Finality veto, double signs, slashing
//! ├── durability.rs       # Restart from disk
//! └── mempool_flows.rs    # Admission, nonce ordering, bans, idempotence
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p lc-tests
//! cargo test -p lc-tests integration::finality_safety
//! ```

pub mod integration;
