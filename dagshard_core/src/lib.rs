//! Core dagshard types and traits.
//!
//! This crate defines the content-addressed building blocks shared by all
//! dagshard crates.
//!
//! ## Wire-stable types
//!
//! - Digests (`multihash::Multihash`, `multihash::HashAlg`)
//! - Content identifiers (`cid::Cid`)
//! - DAG nodes and links (`node::DagNode`, `node::DagLink`)
//!
//! Changing their encodings changes every identifier derived from them.
//!
//! ## Storage
//!
//! - Byte storage abstraction (`Store`, `StoreFeatures`)
//! - The `NodeStore` contract and the `DagStore` facade that implements it
//!   on top of any `Store`

pub mod cid;
pub mod dag;
pub mod multihash;
pub mod node;
pub mod store;

// Test utilities (behind feature flag)
#[cfg(feature = "testutil")]
pub mod testutil;

pub use cid::{Cid, CidError, CidVersion, Codec};
pub use multihash::{HashAlg, Multihash};
pub use node::{DagLink, DagNode, NodeError};

pub use dag::store::DagStore;
pub use dag::{DagError, DagResult, NodeStore, PutOptions};

pub use store::{Store, StoreError, StoreFeatures, StoreResult};
