use dagshard_core::{CidVersion, Codec, HashAlg, PutOptions};
use serde::{Deserialize, Serialize};

use crate::{ShardError, ShardResult, hashing};

pub const DEFAULT_SHARD_SPLIT_THRESHOLD: usize = 1000;
pub const DEFAULT_FANOUT: u32 = 256;
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Persistence and layout options accepted by every entry point.
///
/// `fanout` only applies to shards created by this crate; an existing
/// shard keeps the fanout and hash function recorded in its root.
///
/// ```
/// use dagshard_fs::ShardOptions;
///
/// let options = ShardOptions::from_toml_str("fanout = 16\nflush = false").unwrap();
/// assert_eq!(options.fanout, 16);
/// assert!(options.put_options().hash_only);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ShardOptions {
    pub cid_version: CidVersion,
    pub hash_alg: HashAlg,
    pub codec: Codec,
    /// When false, identifiers are computed but nothing is committed.
    pub flush: bool,
    pub shard_split_threshold: usize,
    pub fanout: u32,
    pub max_depth: usize,
}

impl Default for ShardOptions {
    fn default() -> Self {
        Self {
            cid_version: CidVersion::V1,
            hash_alg: HashAlg::Blake3,
            codec: Codec::DagCbor,
            flush: true,
            shard_split_threshold: DEFAULT_SHARD_SPLIT_THRESHOLD,
            fanout: DEFAULT_FANOUT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ShardOptions {
    pub fn from_toml_str(input: &str) -> ShardResult<Self> {
        let options: ShardOptions = toml::from_str(input)
            .map_err(|e| ShardError::InvalidArgument(format!("options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> ShardResult<()> {
        hashing::validate_fanout(self.fanout).map_err(ShardError::InvalidArgument)?;
        if self.max_depth == 0 {
            return Err(ShardError::InvalidArgument(
                "max-depth must be at least 1".to_string(),
            ));
        }
        if self.codec != Codec::DagCbor {
            return Err(ShardError::InvalidArgument(format!(
                "directory nodes cannot use codec {:?}",
                self.codec
            )));
        }
        if self.cid_version == CidVersion::V0 && self.hash_alg != HashAlg::Sha2_256 {
            return Err(ShardError::InvalidArgument(
                "cid v0 requires hash-alg sha2-256".to_string(),
            ));
        }
        Ok(())
    }

    pub fn put_options(&self) -> PutOptions {
        PutOptions {
            cid_version: self.cid_version,
            codec: self.codec,
            hash_alg: self.hash_alg,
            hash_only: !self.flush,
        }
    }
}
