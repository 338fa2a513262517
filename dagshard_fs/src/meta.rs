//! Directory metadata stored in a node's data field.

use minicbor::{Decode, Encode};

use crate::{ShardError, ShardResult, hashing::HashFn};

/// What a node represents. Decided at runtime from its metadata.
#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cbor(index_only)]
pub enum DirKind {
    #[n(1)]
    Directory,
    #[n(2)]
    File,
    #[n(5)]
    HamtShard,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
#[cbor(map)]
pub struct DirMeta {
    #[n(0)]
    pub kind: DirKind,
    #[n(1)]
    pub fanout: Option<u32>,
    #[n(2)]
    pub hash_fn: Option<u8>,
    #[n(3)]
    #[cbor(with = "minicbor::bytes")]
    pub bitfield: Option<Vec<u8>>,
}

impl DirMeta {
    pub fn directory() -> Self {
        Self {
            kind: DirKind::Directory,
            fanout: None,
            hash_fn: None,
            bitfield: None,
        }
    }

    pub fn file() -> Self {
        Self {
            kind: DirKind::File,
            ..Self::directory()
        }
    }

    pub fn shard(fanout: u32, hash_fn: HashFn, bitfield: Vec<u8>) -> Self {
        Self {
            kind: DirKind::HamtShard,
            fanout: Some(fanout),
            hash_fn: Some(hash_fn.id()),
            bitfield: Some(bitfield),
        }
    }

    pub fn marshal(&self) -> ShardResult<Vec<u8>> {
        minicbor::to_vec(self).map_err(|e| ShardError::Meta(e.to_string()))
    }

    pub fn unmarshal(bytes: &[u8]) -> ShardResult<Self> {
        minicbor::decode(bytes).map_err(|e| ShardError::Meta(e.to_string()))
    }

    /// Fanout and hash function of a shard level.
    pub fn shard_params(&self) -> ShardResult<(u32, HashFn)> {
        if self.kind != DirKind::HamtShard {
            return Err(ShardError::Malformed(format!(
                "expected a sharded directory, found {:?}",
                self.kind
            )));
        }
        let fanout = self
            .fanout
            .ok_or_else(|| ShardError::Meta("shard without fanout".to_string()))?;
        crate::hashing::validate_fanout(fanout).map_err(ShardError::Malformed)?;
        let id = self
            .hash_fn
            .ok_or_else(|| ShardError::Meta("shard without hash function".to_string()))?;
        let hash_fn = HashFn::from_id(id)
            .ok_or_else(|| ShardError::Malformed(format!("unknown hash function {id:#04x}")))?;
        Ok((fanout, hash_fn))
    }
}

/// Occupancy bitfield: `ceil(fanout / 8)` bytes, slot `i` in bit `i % 8`
/// of byte `i / 8`, with the byte order reversed.
pub fn bitfield(fanout: u32, occupied: impl IntoIterator<Item = usize>) -> Vec<u8> {
    let mut bytes = vec![0u8; (fanout as usize).div_ceil(8)];
    for slot in occupied {
        if let Some(byte) = bytes.get_mut(slot / 8) {
            *byte |= 1 << (slot % 8);
        }
    }
    bytes.reverse();
    bytes
}

/// Slots marked in a bitfield produced by [`bitfield`].
pub fn occupied_slots(bitfield: &[u8]) -> Vec<usize> {
    bitfield
        .iter()
        .rev()
        .enumerate()
        .flat_map(|(index, byte)| {
            (0..8)
                .filter(move |bit| (byte >> bit) & 1 == 1)
                .map(move |bit| index * 8 + bit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitfield_layout() {
        let bits = bitfield(256, [0, 9, 255]);
        assert_eq!(bits.len(), 32);
        assert_eq!(bits[31], 0b0000_0001);
        assert_eq!(bits[30], 0b0000_0010);
        assert_eq!(bits[0], 0b1000_0000);
        assert_eq!(occupied_slots(&bits), vec![0, 9, 255]);

        assert_eq!(bitfield(2, [1]), vec![0b10]);
    }

    #[test]
    fn test_marshal_roundtrip() {
        let meta = DirMeta::shard(16, HashFn::Xxh3_64, bitfield(16, [3]));
        let bytes = meta.marshal().unwrap();
        assert_eq!(DirMeta::unmarshal(&bytes).unwrap(), meta);
        assert_eq!(meta.shard_params().unwrap(), (16, HashFn::Xxh3_64));

        let plain = DirMeta::unmarshal(&DirMeta::directory().marshal().unwrap()).unwrap();
        assert_eq!(plain.kind, DirKind::Directory);
        assert_eq!(plain.bitfield, None);
    }

    #[test]
    fn test_shard_params_validation() {
        assert!(matches!(
            DirMeta::file().shard_params(),
            Err(ShardError::Malformed(_))
        ));
        let mut meta = DirMeta::shard(256, HashFn::Xxh3_64, vec![]);
        meta.hash_fn = Some(0x7f);
        assert!(meta.shard_params().is_err());
        meta.hash_fn = Some(HashFn::Xxh3_64.id());
        meta.fanout = Some(300);
        assert!(meta.shard_params().is_err());
    }

    #[test]
    fn test_garbage_is_meta_error() {
        assert!(matches!(
            DirMeta::unmarshal(&[0xff, 0x00]),
            Err(ShardError::Meta(_))
        ));
    }
}
