pub mod paths;
pub mod store;

use crate::{Cid, CidVersion, Codec, DagNode, HashAlg, node::NodeError, store::StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum DagError {
    #[error("node {0} not found")]
    NotFound(Cid),
    #[error("node {0} does not match its identifier")]
    HashMismatch(Cid),
    #[error("cid {0} does not reference a dag node (codec {1:?})")]
    NotADagNode(Cid, Codec),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Store(StoreError),
}

pub type DagResult<T> = Result<T, DagError>;

/// How a node should be identified and whether it should be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutOptions {
    pub cid_version: CidVersion,
    pub codec: Codec,
    pub hash_alg: HashAlg,
    /// Compute the identifier only, without a durable write.
    pub hash_only: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            cid_version: CidVersion::V1,
            codec: Codec::DagCbor,
            hash_alg: HashAlg::Blake3,
            hash_only: false,
        }
    }
}

/// Content-addressed get/put of DAG nodes.
///
/// Implementations must fail `get_node` with [`DagError::NotFound`] when
/// the node is unavailable so callers can tell a miss from a transport
/// failure.
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn get_node(&self, cid: &Cid) -> DagResult<DagNode>;

    async fn put_node(&self, node: &DagNode, options: &PutOptions) -> DagResult<Cid>;
}

#[async_trait]
impl<T: NodeStore + ?Sized> NodeStore for std::sync::Arc<T> {
    async fn get_node(&self, cid: &Cid) -> DagResult<DagNode> {
        (**self).get_node(cid).await
    }

    async fn put_node(&self, node: &DagNode, options: &PutOptions) -> DagResult<Cid> {
        (**self).put_node(node, options).await
    }
}
