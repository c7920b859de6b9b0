//! Storage Adapters
//!
//! Implementations of the `BlobStore` trait.

mod file;
mod memory;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;
