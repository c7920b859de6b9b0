//! # Block Storage (lc-02)
//!
//! Persistence substrate for the ledger. Every concern is stored as one JSON blob
//! wrapped in a versioned envelope (`{"version": 1, "payload": ...}`):
//!
//! | Key | Content |
//! |-----|---------|
//! | `blocks/<height:010>.json` | One block per height |
//! | `checkpoints/<height:010>.json` | Periodic state snapshot plus digest |
//! | `finality_certificates.json` | All finality certificates |
//! | `finality_state.json` | Highest finalized height and hash |
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Atomic Writes | A blob is either the old or the new content, never partial |
//! | 2 | Data Integrity | Block hash and height re-verified on every read |
//! | 3 | Single Writer | A data directory is locked by one process at a time |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Envelope codec and key layout
//! - `ports/` - `BlobStore` outbound port
//! - `adapters/` - File and in-memory stores, directory lock
//! - `service.rs` - Typed `ChainStore` facade

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::lock::DatabaseLock;
pub use adapters::storage::{FileBlobStore, MemoryBlobStore};
pub use domain::envelope::{decode_blob, encode_blob, BLOB_VERSION};
pub use domain::keys;
pub use ports::outbound::BlobStore;
pub use service::ChainStore;
pub use shared_types::StorageError;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
