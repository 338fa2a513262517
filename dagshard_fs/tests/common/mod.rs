#![allow(dead_code)]

use std::sync::Arc;

use dagshard_core::{Cid, CidVersion, Codec, DagLink, DagStore, HashAlg};
use dagshard_fs::{ShardOptions, hashing::slot_index};
use dagshard_store_memory::MemoryStore;
use tracing_subscriber::EnvFilter;

/// Routes engine logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn memory_store() -> Arc<DagStore> {
    Arc::new(MemoryStore::new().to_dag_store())
}

pub fn raw_cid(data: &str) -> Cid {
    Cid::new(CidVersion::V1, Codec::Raw, HashAlg::Blake3, data).unwrap()
}

/// An unnamed link to some file content, as a caller would pass it in.
pub fn file_link(content: &str, size: u64) -> DagLink {
    DagLink::new("", size, raw_cid(content))
}

/// A named entry, as stored in a directory.
pub fn entry(name: &str, size: u64) -> DagLink {
    DagLink::new(name, size, raw_cid(name))
}

pub fn entries(count: usize) -> Vec<DagLink> {
    (0..count)
        .map(|i| entry(&format!("file_{i:05}.bin"), i as u64 + 1))
        .collect()
}

pub fn options(fanout: u32) -> ShardOptions {
    ShardOptions {
        fanout,
        ..ShardOptions::default()
    }
}

/// First generated name accepted by `pred`.
pub fn find_name(pred: impl Fn(&str) -> bool) -> String {
    (0..1_000_000)
        .map(|i| format!("n{i}"))
        .find(|n| pred(n))
        .expect("no matching name")
}

/// A name sharing `anchor`'s slot at depths `0..shared` and differing
/// right after.
pub fn collides_until(anchor: &str, fanout: u32, shared: usize) -> String {
    find_name(|n| {
        n != anchor
            && (0..shared).all(|d| slot_index(n, d, fanout) == slot_index(anchor, d, fanout))
            && slot_index(n, shared, fanout) != slot_index(anchor, shared, fanout)
    })
}

/// A name whose root slot differs from `anchor`'s.
pub fn elsewhere(anchor: &str, fanout: u32) -> String {
    find_name(|n| slot_index(n, 0, fanout) != slot_index(anchor, 0, fanout))
}
