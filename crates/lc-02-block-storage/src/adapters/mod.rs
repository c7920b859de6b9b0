//! Store implementations and process locking.

pub mod lock;
pub mod storage;
