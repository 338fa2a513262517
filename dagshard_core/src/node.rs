use crate::cid::{Cid, CidError, CidVersion, Codec};
use crate::multihash::HashAlg;
use bytes::Bytes;
use minicbor::{Decode, Encode};

#[derive(thiserror::Error, Debug)]
pub enum NodeError {
    #[error("duplicate link name {0:?}")]
    DuplicateLink(String),
    #[error("links are not sorted by name at {0:?}")]
    UnsortedLinks(String),
    #[error("failed to decode node: {0}")]
    Decode(String),
    #[error("failed to encode node: {0}")]
    Encode(String),
    #[error(transparent)]
    Cid(#[from] CidError),
}

/// A named, sized reference to another node or blob.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
#[cbor(array)]
pub struct DagLink {
    #[n(0)]
    pub name: String,
    /// Cumulative size of everything reachable through this link.
    #[n(1)]
    pub size: u64,
    #[n(2)]
    pub cid: Cid,
}

impl DagLink {
    pub fn new(name: impl Into<String>, size: u64, cid: Cid) -> Self {
        Self {
            name: name.into(),
            size,
            cid,
        }
    }
}

/// An immutable DAG node: an opaque data blob plus links unique by name.
///
/// Links are always kept sorted by name so that two nodes with the same
/// logical content encode to the same bytes.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
#[cbor(array)]
pub struct DagNode {
    #[n(0)]
    #[cbor(with = "minicbor::bytes")]
    data: Vec<u8>,
    #[n(1)]
    links: Vec<DagLink>,
}

impl DagNode {
    /// Creates a node, sorting `links` by name.
    pub fn new(data: impl Into<Vec<u8>>, mut links: Vec<DagLink>) -> Result<Self, NodeError> {
        links.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(dup) = links.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(NodeError::DuplicateLink(dup[0].name.clone()));
        }
        Ok(Self {
            data: data.into(),
            links,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn links(&self) -> &[DagLink] {
        &self.links
    }

    pub fn into_links(self) -> Vec<DagLink> {
        self.links
    }

    pub fn link(&self, name: &str) -> Option<&DagLink> {
        self.links
            .binary_search_by(|l| l.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.links[i])
    }

    /// Decodes a node, rejecting link sets that are not strictly sorted.
    pub fn decode(bytes: &[u8]) -> Result<Self, NodeError> {
        let node: DagNode =
            minicbor::decode(bytes).map_err(|e| NodeError::Decode(e.to_string()))?;
        for w in node.links.windows(2) {
            match w[0].name.cmp(&w[1].name) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    return Err(NodeError::DuplicateLink(w[1].name.clone()));
                }
                std::cmp::Ordering::Greater => {
                    return Err(NodeError::UnsortedLinks(w[1].name.clone()));
                }
            }
        }
        Ok(node)
    }

    pub fn encode(&self) -> Result<Bytes, NodeError> {
        let bytes = minicbor::to_vec(self).map_err(|e| NodeError::Encode(e.to_string()))?;
        Ok(bytes.into())
    }

    /// Identifier of this node's encoding under the given tags.
    pub fn cid(&self, version: CidVersion, codec: Codec, alg: HashAlg) -> Result<Cid, NodeError> {
        Ok(Cid::new(version, codec, alg, self.encode()?)?)
    }

    /// Encoded length plus the cumulative sizes of all links.
    pub fn cumulative_size(&self) -> Result<u64, NodeError> {
        let own = self.encode()?.len() as u64;
        Ok(self.links.iter().fold(own, |acc, l| acc.saturating_add(l.size)))
    }
}
