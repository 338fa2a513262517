//! Test utilities for `Store` and `NodeStore` implementations.
//!
//! # Usage
//!
//! In your store crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! dagshard_core = { workspace = true, features = ["testutil"] }
//! ```
//!
//! In your test file:
//!
//! ```ignore
//! use dagshard_core::testutil::StoreTests;
//!
//! #[tokio::test]
//! async fn test_my_store() {
//!     let store = MyStore::new(...);
//!     StoreTests::new(&store).run_all().await.unwrap();
//! }
//! ```

use crate::{
    Cid, DagNode,
    dag::{DagResult, NodeStore, PutOptions},
    store::{Store, StoreError, StoreResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use rand::Rng;
use std::{
    collections::HashSet,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Test suite for `Store` implementations.
///
/// Runs a set of checks verifying that a store behaves according to the
/// `Store` trait contract.
pub struct StoreTests<'a, S> {
    store: &'a S,
    /// Prefix for test files to avoid conflicts
    prefix: String,
}

impl<'a, S: Store> StoreTests<'a, S> {
    pub fn new(store: &'a S) -> Self {
        let prefix = format!("_test_{}/", rand::rng().random::<u32>());
        Self { store, prefix }
    }

    pub fn with_prefix(store: &'a S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn path(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Run all tests.
    pub async fn run_all(&self) -> StoreResult<()> {
        self.test_put_get_bytes().await?;
        self.test_exists().await?;
        self.test_size().await?;
        self.test_delete().await?;
        self.test_missing_is_not_found().await?;
        self.test_list().await?;
        self.test_partial_read().await?;
        self.test_overwrite().await?;

        self.cleanup().await?;

        Ok(())
    }

    pub async fn test_put_get_bytes(&self) -> StoreResult<()> {
        let path = self.path("bytes_test.bin");
        let data = random_bytes(4096);

        self.store.put_bytes(&path, data.clone()).await?;

        let retrieved = self.store.open_read_bytes(&path, 0, None).await?;
        assert_eq!(retrieved, data, "retrieved data should match original");

        Ok(())
    }

    pub async fn test_exists(&self) -> StoreResult<()> {
        let path = self.path("exists_test.bin");

        assert!(
            !self.store.exists(&path).await?,
            "file should not exist before creation"
        );

        self.store
            .put_bytes(&path, Bytes::from_static(b"test"))
            .await?;

        assert!(
            self.store.exists(&path).await?,
            "file should exist after creation"
        );

        Ok(())
    }

    pub async fn test_size(&self) -> StoreResult<()> {
        let path = self.path("size_test.bin");
        let data = Bytes::from(vec![42u8; 12345]);

        self.store.put_bytes(&path, data).await?;

        let size = self.store.size(&path).await?;
        assert_eq!(size, 12345, "size should match data length");

        Ok(())
    }

    pub async fn test_delete(&self) -> StoreResult<()> {
        let path = self.path("delete_test.bin");

        self.store
            .put_bytes(&path, Bytes::from_static(b"to be deleted"))
            .await?;
        self.store.delete(&path).await?;

        assert!(
            !self.store.exists(&path).await?,
            "file should not exist after delete"
        );

        Ok(())
    }

    /// Reading a missing path must surface as `StoreError::NotFound`.
    pub async fn test_missing_is_not_found(&self) -> StoreResult<()> {
        let path = self.path("never_written.bin");
        match self.store.open_read_bytes(&path, 0, None).await {
            Err(StoreError::NotFound) => Ok(()),
            Err(other) => Err(other),
            Ok(_) => panic!("reading a missing path should fail"),
        }
    }

    pub async fn test_list(&self) -> StoreResult<()> {
        let files = ["list_a.bin", "list_b.bin", "subdir/list_c.bin"];

        for file in &files {
            let path = self.path(file);
            self.store
                .put_bytes(&path, Bytes::from_static(b"list test"))
                .await?;
        }

        let mut stream = self.store.list().await?;
        let mut found: HashSet<String> = HashSet::new();

        while let Some(result) = stream.next().await {
            let path = result?;
            if path.starts_with(&self.prefix) {
                found.insert(path);
            }
        }

        for file in &files {
            let path = self.path(file);
            assert!(found.contains(&path), "list should contain {}", path);
        }

        Ok(())
    }

    pub async fn test_partial_read(&self) -> StoreResult<()> {
        let path = self.path("partial_test.bin");
        let data = Bytes::from_static(b"0123456789abcdef");

        self.store.put_bytes(&path, data).await?;

        let partial = self.store.open_read_bytes(&path, 5, None).await?;
        assert_eq!(partial.as_ref(), b"56789abcdef", "offset read should work");

        let partial = self.store.open_read_bytes(&path, 0, Some(5)).await?;
        assert_eq!(partial.as_ref(), b"01234", "length-limited read should work");

        let partial = self.store.open_read_bytes(&path, 4, Some(4)).await?;
        assert_eq!(partial.as_ref(), b"4567", "offset + length read should work");

        Ok(())
    }

    pub async fn test_overwrite(&self) -> StoreResult<()> {
        let path = self.path("overwrite_test.bin");

        self.store
            .put_bytes(&path, Bytes::from_static(b"original content"))
            .await?;
        self.store
            .put_bytes(&path, Bytes::from_static(b"new content"))
            .await?;

        let retrieved = self.store.open_read_bytes(&path, 0, None).await?;
        assert_eq!(
            retrieved.as_ref(),
            b"new content",
            "overwritten content should be new"
        );

        Ok(())
    }

    pub async fn cleanup(&self) -> StoreResult<()> {
        let mut stream = self.store.list().await?;

        while let Some(result) = stream.next().await {
            let path = result?;
            if path.starts_with(&self.prefix) {
                let _ = self.store.delete(&path).await;
            }
        }

        Ok(())
    }
}

/// Wraps a [`NodeStore`] and counts reads and writes.
///
/// Used to assert how many nodes an operation actually touched.
#[derive(Debug, Default)]
pub struct CountingNodeStore<N> {
    inner: N,
    gets: AtomicUsize,
    puts: AtomicUsize,
    hash_only_puts: AtomicUsize,
}

impl<N> CountingNodeStore<N> {
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            hash_only_puts: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Puts that were committed to the inner store.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn hash_only_puts(&self) -> usize {
        self.hash_only_puts.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.puts.store(0, Ordering::SeqCst);
        self.hash_only_puts.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl<N: NodeStore> NodeStore for CountingNodeStore<N> {
    async fn get_node(&self, cid: &Cid) -> DagResult<DagNode> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_node(cid).await
    }

    async fn put_node(&self, node: &DagNode, options: &PutOptions) -> DagResult<Cid> {
        if options.hash_only {
            self.hash_only_puts.fetch_add(1, Ordering::SeqCst);
        } else {
            self.puts.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.put_node(node, options).await
    }
}

/// Generate random bytes for testing.
pub fn random_bytes(len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    rand::rng().fill(&mut data[..]);
    Bytes::from(data)
}
