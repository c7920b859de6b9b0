//! # Outbound Ports (Driven Ports)
//!
//! The persistence substrate the host application injects.

use crate::StorageResult;

/// Abstract key/blob store.
///
/// Keys are `/`-separated relative paths such as `blocks/0000000001.json`.
///
/// Production: `FileBlobStore`
/// Testing: `MemoryBlobStore`
pub trait BlobStore: Send + Sync {
    /// Read a blob, `None` if absent.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Write a blob atomically, replacing any previous content.
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Remove a blob. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// All keys starting with `prefix`, sorted ascending.
    fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;
}
