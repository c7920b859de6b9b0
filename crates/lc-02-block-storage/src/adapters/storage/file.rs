use crate::adapters::lock::DatabaseLock;
use crate::ports::outbound::BlobStore;
use crate::StorageResult;
use parking_lot::Mutex;
use shared_types::StorageError;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// File-per-key blob store rooted at a data directory.
///
/// Writes go to `<key>.tmp`, are fsynced, then renamed over the target, so a
/// crash leaves either the previous or the new blob. The directory is locked
/// for the lifetime of the store.
pub struct FileBlobStore {
    root: PathBuf,
    write_guard: Mutex<()>,
    _lock: DatabaseLock,
}

impl FileBlobStore {
    /// Open (creating if needed) the store at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        let lock = DatabaseLock::acquire(&root)?;
        tracing::info!("[lc-02] 💾 Opened blob store at {}", root.display());
        Ok(Self {
            root,
            write_guard: Mutex::new(()),
            _lock: lock,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::Io(format!("invalid blob key {key:?}")));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_guard.lock();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write atomically via temp file
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(value)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_guard.lock();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let (dir, name_prefix) = match prefix.rfind('/') {
            Some(i) => (&prefix[..=i], &prefix[i + 1..]),
            None => ("", prefix),
        };
        let dir_path = if dir.is_empty() {
            self.root.clone()
        } else {
            self.path_for(dir.trim_end_matches('/'))?
        };

        let entries = match std::fs::read_dir(&dir_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.ends_with(".tmp") || name == "LOCK" || !name.starts_with(name_prefix) {
                continue;
            }
            keys.push(format!("{dir}{name}"));
        }
        keys.sort();
        Ok(keys)
    }
}
