use std::collections::BTreeSet;

use dagshard_core::{DagLink, NodeStore};
use tracing::debug;

use crate::{
    ShardError, ShardOptions, ShardResult,
    bucket::{BucketArena, LeafEntry, ShardRef, Slot},
    hashing::HashFn,
    mutate::validate_name,
    shard::{self, Persisted},
};

/// Builds a sharded directory holding `entries`, each stored under its own
/// link name.
///
/// All entries are placed in memory first and the levels are stored
/// children first, so nothing is read back from the store. The result is
/// the same shard that adding the entries one at a time to an empty shard
/// would produce, whatever their order.
pub async fn build_shard<S>(
    store: &S,
    entries: &[DagLink],
    options: &ShardOptions,
) -> ShardResult<Persisted>
where
    S: NodeStore + ?Sized,
{
    options.validate()?;
    let mut seen = BTreeSet::new();
    for entry in entries {
        validate_name(&entry.name)?;
        if !seen.insert(entry.name.as_str()) {
            return Err(ShardError::InvalidArgument(format!(
                "duplicate entry {:?}",
                entry.name
            )));
        }
    }

    let mut arena = BucketArena::new(options.fanout, HashFn::default());
    let root = arena.alloc(0, None);
    for entry in entries {
        let leaf = LeafEntry::new(entry.name.clone(), entry.cid, entry.size);
        arena.insert_leaf(root, leaf, options.max_depth)?;
    }
    debug!(
        entries = entries.len(),
        levels = arena.len(),
        fanout = options.fanout,
        "build_shard: placed entries"
    );

    let put = options.put_options();
    for id in arena.ids().rev() {
        let Some((parent, slot)) = arena.bucket(id).parent() else {
            continue;
        };
        let persisted = shard::persist_level(store, &arena, id, &put).await?;
        let size = persisted.node.cumulative_size()?;
        arena.put(
            parent,
            slot,
            Slot::Shard(ShardRef {
                cid: Some(persisted.cid),
                size,
                child: Some(id),
            }),
        );
    }
    shard::persist_level(store, &arena, root, &put).await
}

/// An empty sharded directory.
pub async fn empty_shard<S>(store: &S, options: &ShardOptions) -> ShardResult<Persisted>
where
    S: NodeStore + ?Sized,
{
    build_shard(store, &[], options).await
}
