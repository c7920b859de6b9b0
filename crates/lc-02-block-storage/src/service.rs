//! Typed facade over a `BlobStore`.

use crate::domain::envelope::{decode_blob, encode_blob};
use crate::domain::keys;
use crate::ports::outbound::BlobStore;
use crate::StorageResult;
use serde::{de::DeserializeOwned, Serialize};
use shared_types::{Block, StorageError};
use std::sync::Arc;

/// Block, checkpoint and named-document persistence.
///
/// Cheap to clone; all clones share the injected store.
#[derive(Clone)]
pub struct ChainStore {
    store: Arc<dyn BlobStore>,
}

impl ChainStore {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn blob_store(&self) -> Arc<dyn BlobStore> {
        Arc::clone(&self.store)
    }

    // =========================================================================
    // NAMED DOCUMENTS
    // =========================================================================

    /// Write `value` under `key` in a versioned envelope.
    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let bytes = encode_blob(value)?;
        self.store.put(key, &bytes)
    }

    /// Read the envelope under `key`, `None` if absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.store.get(key)? {
            Some(bytes) => decode_blob(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    // =========================================================================
    // BLOCKS
    // =========================================================================

    pub fn put_block(&self, block: &Block) -> StorageResult<()> {
        self.put_json(&keys::block_key(block.index()), block)
    }

    /// Load and integrity-check the block stored at `height`.
    ///
    /// A blob whose header hash or index does not match is `Corrupted`.
    pub fn load_block(&self, height: u64) -> StorageResult<Option<Block>> {
        let key = keys::block_key(height);
        let Some(block) = self.get_json::<Block>(&key)? else {
            return Ok(None);
        };
        if block.index() != height {
            return Err(StorageError::Corrupted {
                key,
                reason: format!("stored index {} at height {height}", block.index()),
            });
        }
        if block.header.compute_hash() != block.hash() {
            return Err(StorageError::Corrupted {
                key,
                reason: "header hash mismatch".to_string(),
            });
        }
        Ok(Some(block))
    }

    /// Heights of all stored blocks, ascending.
    pub fn block_heights(&self) -> StorageResult<Vec<u64>> {
        Ok(self
            .store
            .list(keys::BLOCKS_PREFIX)?
            .iter()
            .filter_map(|k| keys::height_from_key(k))
            .collect())
    }

    /// Remove every stored block above `height`.
    pub fn delete_blocks_above(&self, height: u64) -> StorageResult<usize> {
        let doomed: Vec<u64> = self
            .block_heights()?
            .into_iter()
            .filter(|h| *h > height)
            .collect();
        for h in &doomed {
            self.store.delete(&keys::block_key(*h))?;
        }
        if !doomed.is_empty() {
            tracing::debug!("[lc-02] deleted {} blocks above {}", doomed.len(), height);
        }
        Ok(doomed.len())
    }

    // =========================================================================
    // CHECKPOINTS
    // =========================================================================

    pub fn put_checkpoint<T: Serialize>(&self, height: u64, checkpoint: &T) -> StorageResult<()> {
        self.put_json(&keys::checkpoint_key(height), checkpoint)
    }

    /// Heights of all stored checkpoints, ascending.
    pub fn checkpoint_heights(&self) -> StorageResult<Vec<u64>> {
        Ok(self
            .store
            .list(keys::CHECKPOINTS_PREFIX)?
            .iter()
            .filter_map(|k| keys::height_from_key(k))
            .collect())
    }

    pub fn load_checkpoint<T: DeserializeOwned>(&self, height: u64) -> StorageResult<Option<T>> {
        self.get_json(&keys::checkpoint_key(height))
    }

    /// Remove checkpoints above `height` (they describe an abandoned branch).
    pub fn delete_checkpoints_above(&self, height: u64) -> StorageResult<()> {
        for h in self.checkpoint_heights()? {
            if h > height {
                self.store.delete(&keys::checkpoint_key(h))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBlobStore;
    use shared_types::{BlockHeader, Transaction, ZERO_HASH};

    fn block(index: u64) -> Block {
        let coinbase = Transaction::coinbase(index, [1; 20], 10, 0);
        let mut header = BlockHeader {
            index,
            previous_hash: ZERO_HASH,
            timestamp: index,
            merkle_root: shared_types::merkle_root(&[coinbase.txid]),
            difficulty: 0,
            nonce: 0,
            miner_pubkey: [0; 32],
            hash: ZERO_HASH,
        };
        header.hash = header.compute_hash();
        Block {
            header,
            transactions: vec![coinbase],
        }
    }

    fn store() -> (MemoryBlobStore, ChainStore) {
        let mem = MemoryBlobStore::new();
        (mem.clone(), ChainStore::new(Arc::new(mem)))
    }

    #[test]
    fn test_block_roundtrip_and_heights() {
        let (_, chain) = store();
        for i in 0..3 {
            chain.put_block(&block(i)).unwrap();
        }
        assert_eq!(chain.block_heights().unwrap(), vec![0, 1, 2]);
        assert_eq!(chain.load_block(1).unwrap(), Some(block(1)));
        assert_eq!(chain.load_block(9).unwrap(), None);
    }

    #[test]
    fn test_tampered_block_is_corrupted() {
        let (mem, chain) = store();
        let mut b = block(1);
        b.header.nonce = 99;
        mem.put(&keys::block_key(1), &encode_blob(&b).unwrap()).unwrap();

        assert!(matches!(
            chain.load_block(1),
            Err(StorageError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_delete_above() {
        let (_, chain) = store();
        for i in 0..5 {
            chain.put_block(&block(i)).unwrap();
            chain.put_checkpoint(i, &i).unwrap();
        }
        assert_eq!(chain.delete_blocks_above(2).unwrap(), 2);
        chain.delete_checkpoints_above(2).unwrap();
        assert_eq!(chain.block_heights().unwrap(), vec![0, 1, 2]);
        assert_eq!(chain.checkpoint_heights().unwrap(), vec![0, 1, 2]);
        assert_eq!(chain.load_checkpoint::<u64>(2).unwrap(), Some(2));
    }
}
