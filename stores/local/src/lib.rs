use anyhow::{Context, anyhow};
use bytes::Bytes;
use dagshard_core::store::{PathStream, StoreError, StoreFeatures, StoreResult};
use futures::StreamExt;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use walkdir::WalkDir;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalStoreConfig {
    pub base_path: String,
}

/// Stores objects as plain files below `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        LocalStore {
            base_path: base_path.into(),
        }
    }

    pub fn to_dag_store(self) -> dagshard_core::DagStore {
        dagshard_core::DagStore::new(self)
    }

    pub fn create(config: LocalStoreConfig) -> Self {
        LocalStore {
            base_path: config.base_path.into(),
        }
    }

    fn resolve_path(&self, path: &str) -> StoreResult<PathBuf> {
        if path.contains("..") || path.starts_with('/') {
            return Err(anyhow!(
                "Invalid path: '{}'. Must be a relative path without '..'.",
                path
            )
            .into());
        }
        Ok(self.base_path.join(path))
    }
}

#[async_trait::async_trait]
impl dagshard_core::store::Store for LocalStore {
    fn features(&self) -> StoreFeatures {
        StoreFeatures {
            case_sensitive: false,
            recommended_max_dir_size: 1024,
        }
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        let full_path = self.resolve_path(path)?;
        tokio::fs::try_exists(&full_path).await.map_err(Into::into)
    }

    async fn put_bytes(&self, path: &str, bytes: Bytes) -> StoreResult<()> {
        let full_path = self.resolve_path(path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Each writer gets its own sibling so readers never observe a torn
        // node and concurrent writers of one path never share a temp file.
        let tmp_path = full_path.with_extension(format!("{}.part", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp_path, &bytes).await?;
        match tokio::fs::rename(&tmp_path, &full_path).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                // Another writer already put the object in place.
                if tokio::fs::try_exists(&full_path).await.unwrap_or(false) {
                    Ok(())
                } else {
                    Err(err.into())
                }
            }
        }
    }

    async fn open_read_bytes(
        &self,
        path: &str,
        offset: u64,
        max_len: Option<u64>,
    ) -> StoreResult<Bytes> {
        let full_path = self.resolve_path(path)?;
        let mut file = File::open(&full_path).await.map_err(StoreError::from_io)?;
        let file_len = file.metadata().await?.len();

        if offset >= file_len {
            return Ok(Bytes::new());
        }

        file.seek(std::io::SeekFrom::Start(offset)).await?;

        let len_to_read = match max_len {
            Some(len) => std::cmp::min(len, file_len - offset),
            None => file_len - offset,
        };

        let capacity =
            usize::try_from(len_to_read).context("file segment too large to read into memory")?;
        let mut buffer = Vec::with_capacity(capacity);

        file.take(len_to_read).read_to_end(&mut buffer).await?;

        Ok(Bytes::from(buffer))
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let full_path = self.resolve_path(path)?;
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, path: &str) -> StoreResult<u64> {
        let metadata = tokio::fs::metadata(&self.resolve_path(path)?)
            .await
            .map_err(StoreError::from_io)?;
        Ok(metadata.len())
    }

    async fn list(&self) -> StoreResult<PathStream> {
        let base_path = self.base_path.clone();
        let walker = WalkDir::new(&base_path).into_iter();
        let stream = futures::stream::iter(walker).filter_map(move |entry| {
            futures::future::ready(match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        entry
                            .path()
                            .strip_prefix(&base_path)
                            .ok()
                            .map(|relative| Ok(relative.to_string_lossy().into_owned()))
                    } else {
                        None
                    }
                }
                Err(e) => Some(Err(e.into())),
            })
        });

        Ok(Box::new(stream))
    }
}
