use std::sync::Arc;

use dagshard_core::{Cid, DagLink, NodeStore};
use tokio::sync::{Mutex, watch};

use crate::{ShardOptions, ShardResult, dir};

/// A directory root shared between tasks.
///
/// Writers are serialized: `add` and `remove` hold the writer lock from the
/// first read until the new root is published, so no update is lost.
/// Readers take the latest published root and never wait for a writer.
#[derive(Clone)]
pub struct DirHandle {
    store: Arc<dyn NodeStore>,
    options: ShardOptions,
    writer: Arc<Mutex<()>>,
    root: Arc<watch::Sender<Cid>>,
}

impl std::fmt::Debug for DirHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirHandle")
            .field("root", &self.root())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DirHandle {
    /// Creates a new, empty plain directory.
    pub async fn create(store: Arc<dyn NodeStore>, options: ShardOptions) -> ShardResult<Self> {
        let persisted = dir::create_dir(store.as_ref(), &options).await?;
        Ok(Self::from_parts(store, persisted.cid, options))
    }

    /// Opens an existing directory rooted at `root`.
    pub fn open(store: Arc<dyn NodeStore>, root: Cid, options: ShardOptions) -> ShardResult<Self> {
        options.validate()?;
        Ok(Self::from_parts(store, root, options))
    }

    fn from_parts(store: Arc<dyn NodeStore>, root: Cid, options: ShardOptions) -> Self {
        let (root, _) = watch::channel(root);
        Self {
            store,
            options,
            writer: Arc::new(Mutex::new(())),
            root: Arc::new(root),
        }
    }

    pub fn options(&self) -> &ShardOptions {
        &self.options
    }

    pub fn root(&self) -> Cid {
        *self.root.borrow()
    }

    /// Notifies about every root published after this call.
    pub fn subscribe(&self) -> watch::Receiver<Cid> {
        self.root.subscribe()
    }

    pub async fn add(&self, name: &str, link: &DagLink) -> ShardResult<Cid> {
        let _guard = self.writer.lock().await;
        let current = self.root();
        let persisted =
            dir::add_entry(self.store.as_ref(), &current, name, link, &self.options).await?;
        self.root.send_replace(persisted.cid);
        Ok(persisted.cid)
    }

    pub async fn remove(&self, name: &str) -> ShardResult<Cid> {
        let _guard = self.writer.lock().await;
        let current = self.root();
        let persisted =
            dir::remove_entry(self.store.as_ref(), &current, name, &self.options).await?;
        self.root.send_replace(persisted.cid);
        Ok(persisted.cid)
    }

    pub async fn get(&self, name: &str) -> ShardResult<DagLink> {
        let root = self.root();
        dir::get_entry(self.store.as_ref(), &root, name, &self.options).await
    }

    pub async fn list(&self) -> ShardResult<Vec<DagLink>> {
        let root = self.root();
        dir::list_entries(self.store.as_ref(), &root).await
    }
}
