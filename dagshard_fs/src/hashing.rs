//! Slot derivation for the trie.
//!
//! A name is expanded into an unbounded bit stream: the little-endian bytes
//! of `xxh3_64_with_seed(name, round)` for round 0, 1, 2 and so on. The slot
//! at depth `d` is the `log2(fanout)` bits starting at bit `d * log2(fanout)`,
//! read least significant first. With a fanout of 256 the slot at depth
//! `d < 8` is simply byte `d` of `xxh3_64(name)`.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

pub const MIN_FANOUT: u32 = 2;
pub const MAX_FANOUT: u32 = 256;

/// Hash function recorded in a shard's metadata.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashFn {
    #[default]
    Xxh3_64 = 0x01,
}

impl HashFn {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(HashFn::Xxh3_64),
            _ => None,
        }
    }

    pub fn slot_index(self, name: &str, depth: usize, fanout: u32) -> usize {
        match self {
            HashFn::Xxh3_64 => slot_index(name, depth, fanout),
        }
    }
}

/// Checks that `fanout` is a power of two in `2..=256`.
pub fn validate_fanout(fanout: u32) -> Result<(), String> {
    if !(MIN_FANOUT..=MAX_FANOUT).contains(&fanout) || !fanout.is_power_of_two() {
        return Err(format!(
            "fanout must be a power of two between {MIN_FANOUT} and {MAX_FANOUT}, got {fanout}"
        ));
    }
    Ok(())
}

pub fn bits_per_level(fanout: u32) -> usize {
    fanout.trailing_zeros() as usize
}

/// Slot of `name` at `depth` for a trie with the given `fanout`.
///
/// `fanout` must already be validated.
pub fn slot_index(name: &str, depth: usize, fanout: u32) -> usize {
    let bits = bits_per_level(fanout);
    let start = depth * bits;
    let mut round = usize::MAX;
    let mut word = [0u8; 8];
    let mut slot = 0usize;
    for i in 0..bits {
        let bit = start + i;
        let byte_index = bit / 8;
        if byte_index / 8 != round {
            round = byte_index / 8;
            word = xxh3_64_with_seed(name.as_bytes(), round as u64).to_le_bytes();
        }
        if (word[byte_index % 8] >> (bit % 8)) & 1 == 1 {
            slot |= 1 << i;
        }
    }
    slot
}

/// Slots of `name` for every depth in `depths`.
pub fn slot_indices(
    name: &str,
    fanout: u32,
    depths: std::ops::Range<usize>,
) -> Vec<usize> {
    depths.map(|depth| slot_index(name, depth, fanout)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xxhash_rust::xxh3::xxh3_64;

    #[test]
    fn test_fanout_256_matches_plain_xxh3_bytes() {
        for name in ["a0", "file_0001.txt", "ünïcødé"] {
            let h = xxh3_64(name.as_bytes());
            for depth in 0..8 {
                let expected = ((h >> (8 * depth)) & 0xFF) as usize;
                assert_eq!(slot_index(name, depth, 256), expected);
            }
        }
    }

    #[test]
    fn test_deep_levels_use_next_round() {
        let next = xxh3_64_with_seed(b"a0", 1);
        assert_eq!(slot_index("a0", 8, 256), (next & 0xFF) as usize);
        assert_eq!(slot_index("a0", 9, 256), ((next >> 8) & 0xFF) as usize);
    }

    #[test]
    fn test_small_fanout_splits_bytes() {
        let h = xxh3_64(b"name");
        assert_eq!(slot_index("name", 0, 16), (h & 0xF) as usize);
        assert_eq!(slot_index("name", 1, 16), ((h >> 4) & 0xF) as usize);
        assert_eq!(slot_index("name", 5, 2), ((h >> 5) & 1) as usize);
    }

    #[test]
    fn test_slots_stay_in_range() {
        for fanout in [2, 4, 8, 16, 32, 64, 128, 256] {
            for depth in 0..40 {
                assert!(slot_index("x", depth, fanout) < fanout as usize);
            }
        }
        assert_eq!(slot_indices("x", 256, 0..3).len(), 3);
    }

    #[test]
    fn test_hash_fn_ids() {
        assert_eq!(HashFn::from_id(HashFn::Xxh3_64.id()), Some(HashFn::Xxh3_64));
        assert_eq!(HashFn::from_id(0x22), None);
        assert!(validate_fanout(64).is_ok());
        assert!(validate_fanout(48).is_err());
    }
}
