//! Single-entry inserts and removals on a persisted shard.
//!
//! Both operations resolve the name, edit the terminal bucket in memory and
//! then walk parent handles back to the root, re-encoding and storing every
//! level on the way. Siblings off the path are reused by identifier.

use dagshard_core::{Cid, DagLink, NodeStore, PutOptions};
use tracing::debug;

use crate::{
    ShardError, ShardOptions, ShardResult,
    bucket::{BucketArena, BucketId, LeafEntry, ShardRef, Slot},
    resolve::{Target, resolve},
    shard::{self, Persisted},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Insert,
    /// Levels left with a single leaf are folded into their parent.
    Remove,
}

/// Rejects names no directory can hold.
pub(crate) fn validate_name(name: &str) -> ShardResult<()> {
    if name.is_empty() {
        return Err(ShardError::InvalidArgument("empty entry name".to_string()));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(ShardError::InvalidArgument(format!(
            "entry name {name:?} contains a path separator or NUL"
        )));
    }
    Ok(())
}

/// The link may be unnamed or carry `name` itself.
pub(crate) fn validate_link(name: &str, link: &DagLink) -> ShardResult<()> {
    if !link.name.is_empty() && link.name != name {
        return Err(ShardError::InvalidArgument(format!(
            "link is named {:?} but is being stored as {name:?}",
            link.name
        )));
    }
    Ok(())
}

/// Inserts or replaces `name` in the shard rooted at `parent`.
pub async fn add_child<S>(
    store: &S,
    parent: &Cid,
    name: &str,
    link: &DagLink,
    options: &ShardOptions,
) -> ShardResult<Persisted>
where
    S: NodeStore + ?Sized,
{
    options.validate()?;
    validate_name(name)?;
    validate_link(name, link)?;

    let root_node = shard::load_root(store, parent).await?;
    let mut path = resolve(store, &root_node, name, options.max_depth).await?;
    match &path.target {
        Target::Vacant { .. } => debug!(name, depth = path.depth(), "add_child: empty slot"),
        Target::Found { .. } => debug!(name, depth = path.depth(), "add_child: replacing"),
        Target::Occupied { existing, .. } => debug!(
            name,
            other = existing.name.as_str(),
            depth = path.depth(),
            "add_child: slot taken, splitting"
        ),
    }

    let leaf = LeafEntry::new(name, link.cid, link.size);
    let start = path.leaf_bucket();
    let landed = path.arena.insert_leaf(start, leaf, options.max_depth)?;
    persist_upward(store, &mut path.arena, landed, Walk::Insert, &options.put_options()).await
}

/// Removes `name` from the shard rooted at `parent`.
///
/// Fails with [`ShardError::NoSuchLink`] when the name is absent; the
/// original root stays valid either way.
pub async fn remove_child<S>(
    store: &S,
    parent: &Cid,
    name: &str,
    options: &ShardOptions,
) -> ShardResult<Persisted>
where
    S: NodeStore + ?Sized,
{
    options.validate()?;
    validate_name(name)?;

    let root_node = shard::load_root(store, parent).await?;
    let mut path = resolve(store, &root_node, name, options.max_depth).await?;
    let slot = match path.target {
        Target::Found { slot, .. } => slot,
        Target::Vacant { .. } | Target::Occupied { .. } => {
            return Err(ShardError::NoSuchLink {
                name: name.to_string(),
            });
        }
    };

    let start = path.leaf_bucket();
    path.arena.delete(start, slot);
    debug!(name, depth = path.depth(), "remove_child: deleted link");
    persist_upward(store, &mut path.arena, start, Walk::Remove, &options.put_options()).await
}

/// Stores `start` and every ancestor up to the root, returning the root.
async fn persist_upward<S>(
    store: &S,
    arena: &mut BucketArena,
    start: BucketId,
    walk: Walk,
    put: &PutOptions,
) -> ShardResult<Persisted>
where
    S: NodeStore + ?Sized,
{
    let mut current = start;
    loop {
        let Some((parent, slot)) = arena.bucket(current).parent() else {
            return shard::persist_level(store, arena, current, put).await;
        };

        if walk == Walk::Remove {
            let bucket = arena.bucket(current);
            if bucket.is_empty() {
                debug!(depth = bucket.depth(), "dropping empty subshard");
                arena.delete(parent, slot);
                current = parent;
                continue;
            }
            if let Some((_, Slot::Leaf(leaf))) = bucket.sole_entry() {
                debug!(
                    depth = bucket.depth(),
                    name = leaf.name.as_str(),
                    "collapsing subshard into parent"
                );
                let leaf = leaf.clone();
                arena.put(parent, slot, Slot::Leaf(leaf));
                current = parent;
                continue;
            }
        }

        let persisted = shard::persist_level(store, arena, current, put).await?;
        let size = persisted.node.cumulative_size()?;
        arena.put(
            parent,
            slot,
            Slot::Shard(ShardRef {
                cid: Some(persisted.cid),
                size,
                child: Some(current),
            }),
        );
        current = parent;
    }
}
