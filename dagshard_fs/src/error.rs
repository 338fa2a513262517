use dagshard_core::{Cid, DagError, NodeError};

/// Errors surfaced by the sharding engine.
///
/// Nothing is retried internally; every variant reaches the immediate
/// caller unchanged.
#[derive(thiserror::Error, Debug)]
pub enum ShardError {
    #[error("node {0} not found")]
    NotFound(Cid),
    #[error("no link named {name:?}")]
    NoSuchLink { name: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("hash of {name:?} collides at every level up to depth {depth}")]
    CollisionDepthExhausted { name: String, depth: usize },
    #[error("malformed shard: {0}")]
    Malformed(String),
    #[error("invalid directory metadata: {0}")]
    Meta(String),
    #[error(transparent)]
    Store(DagError),
}

pub type ShardResult<T> = Result<T, ShardError>;

impl From<DagError> for ShardError {
    fn from(err: DagError) -> Self {
        match err {
            DagError::NotFound(cid) => ShardError::NotFound(cid),
            other => ShardError::Store(other),
        }
    }
}

impl From<NodeError> for ShardError {
    fn from(err: NodeError) -> Self {
        ShardError::Malformed(err.to_string())
    }
}
