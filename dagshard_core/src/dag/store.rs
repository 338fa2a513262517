use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;

use crate::{
    Cid, Codec, DagNode,
    dag::{DagError, DagResult, NodeStore, PutOptions},
    store::{Store, StoreError, StoreFeatures, StoreResult},
};

use super::paths;

/// DAG node storage built on top of a generic byte [`Store`].
///
/// `DagStore` keeps encoded nodes under deterministic paths derived from
/// their [`Cid`] and verifies every node it reads against its identifier.
#[derive(Debug, Clone)]
pub struct DagStore {
    store: Arc<dyn Store>,
}

impl DagStore {
    pub fn new<S>(store: S) -> Self
    where
        S: Store + 'static,
    {
        Self {
            store: Arc::new(store),
        }
    }

    /// The underlying byte store.
    pub fn inner(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn path_for_cid(&self, cid: &Cid) -> String {
        paths::path_for_cid(cid, &self.store.features())
    }

    pub fn cid_from_path(
        path: &str,
        features: &StoreFeatures,
    ) -> Result<Option<Cid>, std::io::Error> {
        paths::cid_from_path(path, features)
    }

    pub async fn contains(&self, cid: &Cid) -> StoreResult<bool> {
        self.store.exists(&self.path_for_cid(cid)).await
    }

    pub async fn delete(&self, cid: &Cid) -> StoreResult<()> {
        self.store.delete(&self.path_for_cid(cid)).await
    }

    /// Reads and decodes the node behind `cid`.
    pub async fn get(&self, cid: &Cid) -> DagResult<DagNode> {
        if cid.codec() != Codec::DagCbor {
            return Err(DagError::NotADagNode(*cid, cid.codec()));
        }
        let bytes = match self
            .store
            .open_read_bytes(&self.path_for_cid(cid), 0, None)
            .await
        {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound) => return Err(DagError::NotFound(*cid)),
            Err(err) => return Err(DagError::Store(err)),
        };
        if !cid.verifies(&bytes) {
            return Err(DagError::HashMismatch(*cid));
        }
        Ok(DagNode::decode(&bytes)?)
    }

    /// Encodes `node`, derives its identifier and, unless `hash_only` is
    /// set, writes it to the backend.
    pub async fn put(&self, node: &DagNode, options: &PutOptions) -> DagResult<Cid> {
        let bytes: Bytes = node.encode()?;
        let cid = Cid::new(
            options.cid_version,
            options.codec,
            options.hash_alg,
            &bytes,
        )
        .map_err(crate::node::NodeError::from)?;
        if cid.codec() != Codec::DagCbor {
            return Err(DagError::NotADagNode(cid, cid.codec()));
        }
        if options.hash_only {
            tracing::trace!("dagstore: hash-only put {}", cid);
            return Ok(cid);
        }
        let path = self.path_for_cid(&cid);
        // Identical bytes always land on the same path.
        if !self.store.exists(&path).await.map_err(DagError::Store)? {
            self.store
                .put_bytes(&path, bytes)
                .await
                .map_err(DagError::Store)?;
        }
        Ok(cid)
    }

    /// Returns every node identifier currently stored under `dag/`.
    pub async fn list_cids(&self) -> StoreResult<Vec<Cid>> {
        let features = self.store.features();
        let mut cids = Vec::new();
        let mut stream = self.store.list().await?;

        while let Some(item) = stream.next().await {
            let path = item?;
            if let Some(cid) = Self::cid_from_path(&path, &features)? {
                cids.push(cid);
            }
        }

        Ok(cids)
    }
}

#[async_trait::async_trait]
impl NodeStore for DagStore {
    async fn get_node(&self, cid: &Cid) -> DagResult<DagNode> {
        self.get(cid).await
    }

    async fn put_node(&self, node: &DagNode, options: &PutOptions) -> DagResult<Cid> {
        self.put(node, options).await
    }
}
