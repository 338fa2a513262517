use dagshard_core::{Cid, DagLink, DagNode, NodeStore};
use tracing::trace;

use crate::{
    ShardError, ShardResult,
    bucket::{BucketArena, BucketId, LeafEntry, Slot},
    link_name::ShardLinkName,
    shard,
};

/// One level on the way from the root to a name.
#[derive(Debug, Clone)]
pub struct ShardPathSegment {
    pub bucket: BucketId,
    /// Slot the name maps to at this level, as two hex digits.
    pub prefix: String,
    pub node: DagNode,
}

/// What the terminal level holds in the name's slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Vacant { slot: usize },
    Found { slot: usize, link: LeafEntry },
    /// A different name owns the slot.
    Occupied { slot: usize, existing: LeafEntry },
}

#[derive(Debug, Clone)]
pub struct ShardPath {
    pub arena: BucketArena,
    pub root: BucketId,
    /// Terminal level first, root last. Never empty.
    pub segments: Vec<ShardPathSegment>,
    pub target: Target,
}

impl ShardPath {
    /// Bucket of the terminal level.
    pub fn leaf_bucket(&self) -> BucketId {
        self.segments.first().map_or(self.root, |s| s.bucket)
    }

    pub fn depth(&self) -> usize {
        self.arena.bucket(self.leaf_bucket()).depth()
    }
}

/// Descends from `root_node` towards `name`, fetching only the subshards on
/// the way.
///
/// Subshards are materialized as buckets in the returned arena, each one
/// attached to the slot it was reached through. A store miss aborts the
/// whole call.
pub async fn resolve<S>(
    store: &S,
    root_node: &DagNode,
    name: &str,
    max_depth: usize,
) -> ShardResult<ShardPath>
where
    S: NodeStore + ?Sized,
{
    let (fanout, hash_fn) = shard::shard_params(root_node)?;
    let mut arena = BucketArena::new(fanout, hash_fn);
    let root = arena.alloc(0, None);
    shard::decode_level(&mut arena, root, root_node)?;

    let mut segments = Vec::new();
    let mut current = root;
    let mut node = root_node.clone();

    let target = loop {
        let depth = arena.bucket(current).depth();
        let slot = arena.slot_for(name, depth);
        trace!(name, depth, slot, "resolve: visiting level");

        let entry = arena.bucket(current).get(slot).cloned();
        segments.push(ShardPathSegment {
            bucket: current,
            prefix: ShardLinkName::prefix(slot),
            node,
        });

        match entry {
            None => break Target::Vacant { slot },
            Some(Slot::Leaf(leaf)) if leaf.name == name => {
                break Target::Found { slot, link: leaf };
            }
            Some(Slot::Leaf(existing)) => break Target::Occupied { slot, existing },
            Some(Slot::Shard(shard_ref)) => {
                if depth + 1 >= max_depth {
                    return Err(ShardError::Malformed(format!(
                        "subshard at depth {} exceeds max depth {max_depth}",
                        depth + 1
                    )));
                }
                let cid = shard_ref.cid.ok_or_else(|| {
                    ShardError::Malformed(format!("subshard in slot {slot} has no identifier"))
                })?;
                trace!(depth, slot, "resolve: loading subshard {}", cid.fmt_short());
                let child_node = shard::load(store, &cid).await?;
                let child = arena.alloc(depth + 1, Some((current, slot)));
                shard::decode_level(&mut arena, child, &child_node)?;
                arena.attach_child(current, slot, child)?;
                current = child;
                node = child_node;
            }
        }
    };

    segments.reverse();
    Ok(ShardPath {
        arena,
        root,
        segments,
        target,
    })
}

/// Finds the entry `name` in the shard rooted at `root`.
///
/// The returned link carries the entry's own name, not its slot-prefixed
/// form.
pub async fn lookup<S>(store: &S, root: &Cid, name: &str, max_depth: usize) -> ShardResult<DagLink>
where
    S: NodeStore + ?Sized,
{
    let root_node = shard::load_root(store, root).await?;
    let path = resolve(store, &root_node, name, max_depth).await?;
    match path.target {
        Target::Found { link, .. } => Ok(link.to_link()),
        Target::Vacant { .. } | Target::Occupied { .. } => Err(ShardError::NoSuchLink {
            name: name.to_string(),
        }),
    }
}
