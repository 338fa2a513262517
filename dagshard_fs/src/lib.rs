//! # Sharded directories over a content-addressed DAG
//!
//! Large directories are stored as a hash array mapped trie: every level is
//! an immutable [`DagNode`](dagshard_core::DagNode) whose links are either
//! entries (`"3Fname"`) or nested levels (`"3F"`), and whose metadata
//! records the fanout, hash function and an occupancy bitfield.
//!
//! ## Layers
//! 1. `hashing`, `bucket`, `link_name`, `meta` – pure, in-memory pieces.
//! 2. `shard` – converts single levels between nodes and buckets.
//! 3. `resolve`, `mutate`, `build` – lazy lookups, single-entry edits with
//!    bottom-up re-persistence, and bulk construction.
//! 4. `dir`, `handle` – plain/sharded dispatch and a serialized writer per
//!    directory root.
//!
//! Every operation that writes returns the new root as a [`Persisted`]
//! node. Callers must serialize writes against the same root themselves or
//! go through a [`DirHandle`].

pub mod bucket;
pub mod build;
pub mod debug;
pub mod dir;
mod error;
pub mod handle;
pub mod hashing;
pub mod link_name;
pub mod meta;
pub mod mutate;
mod options;
pub mod resolve;
pub mod shard;

pub use build::{build_shard, empty_shard};
pub use dir::{Directory, add_entry, create_dir, get_entry, kind_of, list_entries, remove_entry};
pub use error::{ShardError, ShardResult};
pub use handle::DirHandle;
pub use hashing::HashFn;
pub use link_name::ShardLinkName;
pub use meta::{DirKind, DirMeta};
pub use mutate::{add_child, remove_child};
pub use options::{
    DEFAULT_FANOUT, DEFAULT_MAX_DEPTH, DEFAULT_SHARD_SPLIT_THRESHOLD, ShardOptions,
};
pub use resolve::{ShardPath, ShardPathSegment, Target, lookup, resolve};
pub use shard::Persisted;
