//! Conversion between shard nodes and buckets.

use dagshard_core::{Cid, DagLink, DagNode, NodeStore, PutOptions};
use tracing::{debug, warn};

use crate::{
    ShardError, ShardResult,
    bucket::{BucketArena, BucketId, LeafEntry, ShardRef, Slot},
    hashing::HashFn,
    link_name::ShardLinkName,
    meta::{DirKind, DirMeta},
};

/// A node that was just encoded and handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persisted {
    pub node: DagNode,
    pub cid: Cid,
}

/// Fanout and hash function recorded in a shard node.
pub fn shard_params(node: &DagNode) -> ShardResult<(u32, HashFn)> {
    DirMeta::unmarshal(node.data())?.shard_params()
}

/// Fills the empty bucket `id` from the links of `node`.
///
/// The node must be a shard with the arena's fanout and hash function.
/// Leaves must sit in the slot their name hashes to at this depth. A
/// stored bitfield that disagrees with the links is repaired from them.
pub fn decode_level(arena: &mut BucketArena, id: BucketId, node: &DagNode) -> ShardResult<()> {
    let meta = DirMeta::unmarshal(node.data())?;
    let (fanout, hash_fn) = meta.shard_params()?;
    if fanout != arena.fanout() || hash_fn != arena.hash_fn() {
        return Err(ShardError::Malformed(format!(
            "level uses fanout {fanout} / {hash_fn:?}, root uses {} / {:?}",
            arena.fanout(),
            arena.hash_fn()
        )));
    }
    let depth = arena.bucket(id).depth();

    for link in node.links() {
        let (slot, entry) = match ShardLinkName::parse(&link.name, fanout)? {
            ShardLinkName::Subshard { slot } => (
                slot,
                Slot::Shard(ShardRef {
                    cid: Some(link.cid),
                    size: link.size,
                    child: None,
                }),
            ),
            ShardLinkName::Leaf { slot, name } => {
                if arena.slot_for(&name, depth) != slot {
                    return Err(ShardError::Malformed(format!(
                        "entry {name:?} stored in slot {slot} at depth {depth}"
                    )));
                }
                (slot, Slot::Leaf(LeafEntry::new(name, link.cid, link.size)))
            }
        };
        if arena.put(id, slot, entry).is_some() {
            return Err(ShardError::Malformed(format!(
                "slot {slot} at depth {depth} is occupied twice"
            )));
        }
    }

    let expected = arena.bit_field(id);
    if meta.bitfield.as_deref() != Some(expected.as_slice()) {
        warn!(depth, "shard bitfield disagrees with its links; rebuilding from links");
    }
    Ok(())
}

/// Encodes bucket `id` with a freshly computed bitfield.
///
/// Every subshard in the bucket must already have an identifier.
pub fn encode_level(arena: &BucketArena, id: BucketId) -> ShardResult<DagNode> {
    let bucket = arena.bucket(id);
    let mut links = Vec::with_capacity(bucket.occupied());
    for (slot, entry) in bucket.slots() {
        let link = match entry {
            Slot::Leaf(leaf) => leaf.shard_link(slot),
            Slot::Shard(shard) => {
                let cid = shard.cid.ok_or_else(|| {
                    ShardError::Malformed(format!(
                        "subshard in slot {slot} at depth {} was never persisted",
                        bucket.depth()
                    ))
                })?;
                DagLink::new(ShardLinkName::Subshard { slot }.to_string(), shard.size, cid)
            }
        };
        links.push(link);
    }
    let meta = DirMeta::shard(arena.fanout(), arena.hash_fn(), arena.bit_field(id));
    Ok(DagNode::new(meta.marshal()?, links)?)
}

/// Encodes bucket `id` and stores it.
pub async fn persist_level<S>(
    store: &S,
    arena: &BucketArena,
    id: BucketId,
    options: &PutOptions,
) -> ShardResult<Persisted>
where
    S: NodeStore + ?Sized,
{
    let node = encode_level(arena, id)?;
    let cid = store.put_node(&node, options).await?;
    debug!(
        depth = arena.bucket(id).depth(),
        links = node.links().len(),
        hash_only = options.hash_only,
        "persisted shard level {}",
        cid.fmt_short()
    );
    Ok(Persisted { node, cid })
}

/// Loads the node behind `cid`.
pub async fn load<S>(store: &S, cid: &Cid) -> ShardResult<DagNode>
where
    S: NodeStore + ?Sized,
{
    Ok(store.get_node(cid).await?)
}

/// Loads the root of a sharded directory.
///
/// Plain directories and files are rejected as [`ShardError::InvalidArgument`].
pub async fn load_root<S>(store: &S, cid: &Cid) -> ShardResult<DagNode>
where
    S: NodeStore + ?Sized,
{
    let node = load(store, cid).await?;
    let kind = DirMeta::unmarshal(node.data())?.kind;
    if kind != DirKind::HamtShard {
        return Err(ShardError::InvalidArgument(format!(
            "{} is a {kind:?}, not a sharded directory",
            cid.fmt_short()
        )));
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::bitfield;
    use dagshard_core::{CidVersion, Codec, HashAlg};

    fn raw(data: &str) -> Cid {
        Cid::new(CidVersion::V1, Codec::Raw, HashAlg::Blake3, data).unwrap()
    }

    fn arena(fanout: u32) -> (BucketArena, BucketId) {
        let mut arena = BucketArena::new(fanout, HashFn::Xxh3_64);
        let root = arena.alloc(0, None);
        (arena, root)
    }

    #[test]
    fn test_encode_decode_level() {
        let (mut source, root) = arena(256);
        for name in ["alpha", "beta", "gamma"] {
            source
                .insert_leaf(root, LeafEntry::new(name, raw(name), 7), 8)
                .unwrap();
        }
        let node = encode_level(&source, root).unwrap();
        assert_eq!(shard_params(&node).unwrap(), (256, HashFn::Xxh3_64));

        let (mut decoded, id) = arena(256);
        decode_level(&mut decoded, id, &node).unwrap();
        assert_eq!(decoded.bucket(id).occupied(), 3);
        assert_eq!(encode_level(&decoded, id).unwrap(), node);
    }

    #[test]
    fn test_leaf_in_wrong_slot_is_malformed() {
        let (arena_ref, _) = arena(256);
        let slot = (arena_ref.slot_for("alpha", 0) + 1) % 256;
        let link = LeafEntry::new("alpha", raw("alpha"), 1).shard_link(slot);
        let meta = DirMeta::shard(256, HashFn::Xxh3_64, bitfield(256, [slot]));
        let node = DagNode::new(meta.marshal().unwrap(), vec![link]).unwrap();

        let (mut decoded, id) = arena(256);
        assert!(matches!(
            decode_level(&mut decoded, id, &node),
            Err(ShardError::Malformed(_))
        ));
    }

    #[test]
    fn test_stale_bitfield_is_repaired() {
        let (arena_ref, _) = arena(16);
        let slot = arena_ref.slot_for("alpha", 0);
        let link = LeafEntry::new("alpha", raw("alpha"), 1).shard_link(slot);
        let stale = DirMeta::shard(16, HashFn::Xxh3_64, vec![0, 0]);
        let node = DagNode::new(stale.marshal().unwrap(), vec![link]).unwrap();

        let (mut decoded, id) = arena(16);
        decode_level(&mut decoded, id, &node).unwrap();
        let fresh = encode_level(&decoded, id).unwrap();
        let meta = DirMeta::unmarshal(fresh.data()).unwrap();
        assert_eq!(meta.bitfield, Some(bitfield(16, [slot])));
    }

    #[test]
    fn test_fanout_mismatch_is_malformed() {
        let node = DagNode::new(
            DirMeta::shard(16, HashFn::Xxh3_64, bitfield(16, [])).marshal().unwrap(),
            vec![],
        )
        .unwrap();
        let (mut decoded, id) = arena(256);
        assert!(matches!(
            decode_level(&mut decoded, id, &node),
            Err(ShardError::Malformed(_))
        ));
    }

    #[test]
    fn test_unpersisted_subshard_cannot_encode() {
        let (mut source, root) = arena(4);
        let child = source.alloc(1, Some((root, 0)));
        source.put(
            root,
            0,
            Slot::Shard(ShardRef {
                cid: None,
                size: 0,
                child: Some(child),
            }),
        );
        assert!(matches!(
            encode_level(&source, root),
            Err(ShardError::Malformed(_))
        ));
    }
}
