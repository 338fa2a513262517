//! In-memory mirror of trie levels.
//!
//! Buckets live in a [`BucketArena`] and refer to each other through
//! [`BucketId`] handles. A child always records the bucket and slot it
//! hangs off, so a mutation can walk back up to the root without any
//! shared ownership. Children are allocated after their parents, which
//! means a reverse walk over the arena visits every child before its
//! parent.

use std::collections::BTreeMap;

use dagshard_core::{Cid, DagLink};

use crate::{ShardError, ShardResult, hashing::HashFn, link_name::ShardLinkName, meta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId(usize);

impl BucketId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A directory entry stored in a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafEntry {
    pub name: String,
    pub cid: Cid,
    pub size: u64,
}

impl LeafEntry {
    pub fn new(name: impl Into<String>, cid: Cid, size: u64) -> Self {
        Self {
            name: name.into(),
            cid,
            size,
        }
    }

    /// The entry as seen by directory users, under its own name.
    pub fn to_link(&self) -> DagLink {
        DagLink::new(self.name.clone(), self.size, self.cid)
    }

    /// The entry as stored in a shard level occupying `slot`.
    pub fn shard_link(&self, slot: usize) -> DagLink {
        let name = ShardLinkName::Leaf {
            slot,
            name: self.name.clone(),
        };
        DagLink::new(name.to_string(), self.size, self.cid)
    }
}

/// A nested level. `cid` is set once the level has been persisted (or was
/// decoded from a link); `child` once it has been materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardRef {
    pub cid: Option<Cid>,
    pub size: u64,
    pub child: Option<BucketId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Leaf(LeafEntry),
    Shard(ShardRef),
}

#[derive(Debug, Clone)]
pub struct Bucket {
    depth: usize,
    parent: Option<(BucketId, usize)>,
    slots: BTreeMap<usize, Slot>,
}

impl Bucket {
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Parent bucket and the slot this bucket occupies in it.
    pub fn parent(&self) -> Option<(BucketId, usize)> {
        self.parent
    }

    pub fn get(&self, slot: usize) -> Option<&Slot> {
        self.slots.get(&slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = (usize, &Slot)> {
        self.slots.iter().map(|(slot, entry)| (*slot, entry))
    }

    pub fn occupied(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn sole_entry(&self) -> Option<(usize, &Slot)> {
        if self.slots.len() == 1 {
            self.slots().next()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct BucketArena {
    fanout: u32,
    hash_fn: HashFn,
    buckets: Vec<Bucket>,
}

impl BucketArena {
    /// `fanout` must already be validated.
    pub fn new(fanout: u32, hash_fn: HashFn) -> Self {
        Self {
            fanout,
            hash_fn,
            buckets: Vec::new(),
        }
    }

    pub fn fanout(&self) -> u32 {
        self.fanout
    }

    pub fn hash_fn(&self) -> HashFn {
        self.hash_fn
    }

    /// Number of slots per level.
    pub fn table_size(&self) -> usize {
        self.fanout as usize
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn ids(&self) -> impl DoubleEndedIterator<Item = BucketId> + use<> {
        (0..self.buckets.len()).map(BucketId)
    }

    pub fn alloc(&mut self, depth: usize, parent: Option<(BucketId, usize)>) -> BucketId {
        let id = BucketId(self.buckets.len());
        self.buckets.push(Bucket {
            depth,
            parent,
            slots: BTreeMap::new(),
        });
        id
    }

    pub fn bucket(&self, id: BucketId) -> &Bucket {
        &self.buckets[id.0]
    }

    pub fn slot_for(&self, name: &str, depth: usize) -> usize {
        self.hash_fn.slot_index(name, depth, self.fanout)
    }

    /// Slot `name` maps to inside bucket `id`.
    pub fn find_insertion_slot(&self, id: BucketId, name: &str) -> usize {
        self.slot_for(name, self.bucket(id).depth)
    }

    pub fn put(&mut self, id: BucketId, slot: usize, entry: Slot) -> Option<Slot> {
        self.buckets[id.0].slots.insert(slot, entry)
    }

    pub fn delete(&mut self, id: BucketId, slot: usize) -> Option<Slot> {
        self.buckets[id.0].slots.remove(&slot)
    }

    /// Records that the subshard in `slot` of `id` has been materialized as
    /// bucket `child`.
    pub fn attach_child(&mut self, id: BucketId, slot: usize, child: BucketId) -> ShardResult<()> {
        match self.buckets[id.0].slots.get_mut(&slot) {
            Some(Slot::Shard(shard)) => {
                shard.child = Some(child);
                Ok(())
            }
            _ => Err(ShardError::Malformed(format!(
                "slot {slot} at depth {} is not a subshard",
                self.buckets[id.0].depth
            ))),
        }
    }

    pub fn bit_field(&self, id: BucketId) -> Vec<u8> {
        meta::bitfield(self.fanout, self.bucket(id).slots.keys().copied())
    }

    /// Places `leaf` below bucket `id`, splitting slots that already hold a
    /// different name. Returns the bucket the leaf ended up in.
    ///
    /// Every subshard met on the way must already be materialized. Fails
    /// with [`ShardError::CollisionDepthExhausted`] when a split would need
    /// a level at `max_depth` or deeper.
    pub fn insert_leaf(
        &mut self,
        id: BucketId,
        leaf: LeafEntry,
        max_depth: usize,
    ) -> ShardResult<BucketId> {
        let mut current = id;
        loop {
            let depth = self.bucket(current).depth;
            let slot = self.slot_for(&leaf.name, depth);
            match self.bucket(current).get(slot) {
                None => {
                    self.put(current, slot, Slot::Leaf(leaf));
                    return Ok(current);
                }
                Some(Slot::Leaf(existing)) if existing.name == leaf.name => {
                    self.put(current, slot, Slot::Leaf(leaf));
                    return Ok(current);
                }
                Some(Slot::Leaf(_)) => {
                    if depth + 1 >= max_depth {
                        return Err(ShardError::CollisionDepthExhausted {
                            name: leaf.name,
                            depth: max_depth,
                        });
                    }
                    let child = self.alloc(depth + 1, Some((current, slot)));
                    let displaced = self.put(
                        current,
                        slot,
                        Slot::Shard(ShardRef {
                            cid: None,
                            size: 0,
                            child: Some(child),
                        }),
                    );
                    if let Some(Slot::Leaf(existing)) = displaced {
                        let existing_slot = self.slot_for(&existing.name, depth + 1);
                        self.put(child, existing_slot, Slot::Leaf(existing));
                    }
                    tracing::trace!(depth, slot, "split slot into new subshard");
                    current = child;
                }
                Some(Slot::Shard(shard)) => {
                    current = shard.child.ok_or_else(|| {
                        ShardError::Malformed(format!(
                            "subshard in slot {slot} at depth {depth} was not loaded"
                        ))
                    })?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagshard_core::{CidVersion, Codec, HashAlg};

    fn leaf(name: &str) -> LeafEntry {
        let cid = Cid::new(CidVersion::V1, Codec::Raw, HashAlg::Blake3, name).unwrap();
        LeafEntry::new(name, cid, name.len() as u64)
    }

    /// Two names that share their slot at depths `0..shared` for `fanout`.
    fn colliding_pair(fanout: u32, shared: usize) -> (String, String) {
        let names: Vec<String> = (0..10_000).map(|i| format!("n{i}")).collect();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                if (0..shared).all(|d| {
                    crate::hashing::slot_index(a, d, fanout)
                        == crate::hashing::slot_index(b, d, fanout)
                }) {
                    return (a.clone(), b.clone());
                }
            }
        }
        panic!("no colliding pair found");
    }

    #[test]
    fn test_insert_and_replace() {
        let mut arena = BucketArena::new(256, HashFn::Xxh3_64);
        let root = arena.alloc(0, None);
        arena.insert_leaf(root, leaf("a"), 8).unwrap();
        arena.insert_leaf(root, leaf("b"), 8).unwrap();
        let mut replacement = leaf("a");
        replacement.size = 99;
        arena.insert_leaf(root, replacement, 8).unwrap();

        let slot = arena.find_insertion_slot(root, "a");
        assert!(matches!(arena.bucket(root).get(slot), Some(Slot::Leaf(l)) if l.size == 99));
        assert_eq!(arena.bucket(root).occupied(), 2);
        assert_eq!(arena.table_size(), 256);
    }

    #[test]
    fn test_collision_splits_into_subshard() {
        let (a, b) = colliding_pair(4, 1);
        let mut arena = BucketArena::new(4, HashFn::Xxh3_64);
        let root = arena.alloc(0, None);
        arena.insert_leaf(root, leaf(&a), 16).unwrap();
        let landed = arena.insert_leaf(root, leaf(&b), 16).unwrap();

        assert_ne!(landed, root);
        assert_eq!(arena.bucket(root).occupied(), 1);
        let slot = arena.find_insertion_slot(root, &a);
        assert!(matches!(arena.bucket(root).get(slot), Some(Slot::Shard(_))));

        // Both names live somewhere below the root, reachable via parents.
        let mut up = landed;
        while let Some((parent, _)) = arena.bucket(up).parent() {
            up = parent;
        }
        assert_eq!(up, root);
    }

    #[test]
    fn test_collision_depth_exhausted() {
        let (a, b) = colliding_pair(2, 2);
        let mut arena = BucketArena::new(2, HashFn::Xxh3_64);
        let root = arena.alloc(0, None);
        arena.insert_leaf(root, leaf(&a), 2).unwrap();
        let err = arena.insert_leaf(root, leaf(&b), 2).unwrap_err();
        assert!(matches!(
            err,
            ShardError::CollisionDepthExhausted { name, depth: 2 } if name == b
        ));
    }

    #[test]
    fn test_bit_field_tracks_occupancy() {
        let mut arena = BucketArena::new(8, HashFn::Xxh3_64);
        let root = arena.alloc(0, None);
        arena.put(root, 3, Slot::Leaf(leaf("x")));
        assert_eq!(arena.bit_field(root), vec![0b0000_1000]);
        arena.delete(root, 3);
        assert_eq!(arena.bit_field(root), vec![0]);
        assert!(arena.bucket(root).is_empty());
    }
}
