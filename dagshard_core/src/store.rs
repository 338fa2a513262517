use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

/// Errors surfaced by byte-level [`Store`] backends.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Maps `io::ErrorKind::NotFound` onto [`StoreError::NotFound`] so
    /// callers never have to inspect the io error themselves.
    pub fn from_io(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound
        } else {
            StoreError::Io(err)
        }
    }
}

pub type StoreResult<T, E = StoreError> = std::result::Result<T, E>;

pub type PathStream = Box<dyn Stream<Item = Result<String, std::io::Error>> + Send + Unpin + 'static>;

/// Flat key/value byte storage addressed by relative paths.
#[async_trait]
pub trait Store: std::fmt::Debug + Send + Sync + 'static {
    fn features(&self) -> StoreFeatures;

    async fn exists(&self, path: &str) -> StoreResult<bool>;

    async fn put_bytes(&self, path: &str, bytes: Bytes) -> StoreResult<()>;

    async fn open_read_bytes(
        &self,
        path: &str,
        offset: u64,
        max_len: Option<u64>,
    ) -> StoreResult<Bytes>;

    async fn size(&self, path: &str) -> StoreResult<u64>;

    async fn list(&self) -> StoreResult<PathStream>;

    async fn delete(&self, path: &str) -> StoreResult<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct StoreFeatures {
    pub case_sensitive: bool,
    pub recommended_max_dir_size: u64,
}
