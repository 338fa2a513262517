use bytes::Bytes;
use dagshard_core::{
    DagStore,
    store::{PathStream, StoreError, StoreFeatures, StoreResult},
};
use dashmap::DashMap;
use futures::stream;

use std::io;

/// A [`Store`](dagshard_core::Store) that keeps every object in a
/// concurrent hash map.
#[derive(Debug)]
pub struct MemoryStore {
    files: DashMap<String, Bytes>,
}

impl MemoryStore {
    /// Creates a new, empty `MemoryStore`.
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
        }
    }

    pub fn to_dag_store(self) -> DagStore {
        DagStore::new(self)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl dagshard_core::store::Store for MemoryStore {
    fn features(&self) -> StoreFeatures {
        StoreFeatures {
            case_sensitive: true,
            recommended_max_dir_size: u64::MAX,
        }
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        Ok(self.files.contains_key(path))
    }

    async fn put_bytes(&self, path: &str, bytes: Bytes) -> StoreResult<()> {
        self.files.insert(path.to_string(), bytes);
        Ok(())
    }

    /// Returns the bytes of the object at the given path.
    async fn open_read_bytes(
        &self,
        path: &str,
        offset: u64,
        max_len: Option<u64>,
    ) -> StoreResult<Bytes> {
        let file = self.files.get(path).ok_or(StoreError::NotFound)?;
        let file_len = file.len();
        let start = offset as usize;

        if start >= file_len {
            return Ok(Bytes::new());
        }

        let remaining = file_len - start;
        let len = match max_len {
            Some(max) => std::cmp::min(remaining, max as usize),
            None => remaining,
        };
        let end = start + len;

        Ok(file.slice(start..end))
    }

    async fn size(&self, path: &str) -> StoreResult<u64> {
        let file = self.files.get(path).ok_or(StoreError::NotFound)?;
        Ok(file.len() as u64)
    }

    async fn list(&self) -> StoreResult<PathStream> {
        let keys: Vec<Result<String, io::Error>> = self
            .files
            .iter()
            .map(|entry| Ok(entry.key().clone()))
            .collect();
        Ok(Box::new(stream::iter(keys)))
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.files.remove(path).ok_or(StoreError::NotFound)?;
        Ok(())
    }
}
