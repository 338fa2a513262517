//! Plain and sharded directories behind one set of entry operations.
//!
//! A plain directory is a single node whose links are its entries. Once an
//! insert leaves it with more than `shard_split_threshold` entries it is
//! rebuilt as a shard. Sharded directories never turn plain again.

use dagshard_core::{Cid, DagLink, DagNode, NodeStore};
use tracing::debug;

use crate::{
    ShardError, ShardOptions, ShardResult,
    build::build_shard,
    link_name::ShardLinkName,
    meta::{DirKind, DirMeta},
    mutate::{self, validate_link, validate_name},
    resolve,
    shard::{self, Persisted},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directory {
    Plain(DagNode),
    Sharded(DagNode),
}

impl Directory {
    pub fn from_node(node: DagNode) -> ShardResult<Self> {
        match DirMeta::unmarshal(node.data())?.kind {
            DirKind::Directory => Ok(Directory::Plain(node)),
            DirKind::HamtShard => Ok(Directory::Sharded(node)),
            DirKind::File => Err(ShardError::InvalidArgument(
                "node is a file, not a directory".to_string(),
            )),
        }
    }

    pub fn kind(&self) -> DirKind {
        match self {
            Directory::Plain(_) => DirKind::Directory,
            Directory::Sharded(_) => DirKind::HamtShard,
        }
    }

    pub fn node(&self) -> &DagNode {
        match self {
            Directory::Plain(node) | Directory::Sharded(node) => node,
        }
    }
}

async fn open<S>(store: &S, cid: &Cid) -> ShardResult<Directory>
where
    S: NodeStore + ?Sized,
{
    Directory::from_node(shard::load(store, cid).await?)
}

async fn put_plain<S>(
    store: &S,
    links: Vec<DagLink>,
    options: &ShardOptions,
) -> ShardResult<Persisted>
where
    S: NodeStore + ?Sized,
{
    let node = DagNode::new(DirMeta::directory().marshal()?, links)?;
    let cid = store.put_node(&node, &options.put_options()).await?;
    Ok(Persisted { node, cid })
}

/// An empty plain directory.
pub async fn create_dir<S>(store: &S, options: &ShardOptions) -> ShardResult<Persisted>
where
    S: NodeStore + ?Sized,
{
    options.validate()?;
    put_plain(store, Vec::new(), options).await
}

pub async fn kind_of<S>(store: &S, cid: &Cid) -> ShardResult<DirKind>
where
    S: NodeStore + ?Sized,
{
    let node = shard::load(store, cid).await?;
    Ok(DirMeta::unmarshal(node.data())?.kind)
}

/// Inserts or replaces `name`, converting a plain directory into a shard
/// when it grows past the threshold.
pub async fn add_entry<S>(
    store: &S,
    dir: &Cid,
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

    match open(store, dir).await? {
        Directory::Sharded(_) => mutate::add_child(store, dir, name, link, options).await,
        Directory::Plain(node) => {
            let mut links: Vec<DagLink> = node
                .into_links()
                .into_iter()
                .filter(|l| l.name != name)
                .collect();
            links.push(DagLink::new(name, link.size, link.cid));
            if links.len() > options.shard_split_threshold {
                debug!(
                    entries = links.len(),
                    threshold = options.shard_split_threshold,
                    "converting plain directory into a shard"
                );
                build_shard(store, &links, options).await
            } else {
                put_plain(store, links, options).await
            }
        }
    }
}

pub async fn remove_entry<S>(
    store: &S,
    dir: &Cid,
    name: &str,
    options: &ShardOptions,
) -> ShardResult<Persisted>
where
    S: NodeStore + ?Sized,
{
    options.validate()?;
    validate_name(name)?;

    match open(store, dir).await? {
        Directory::Sharded(_) => mutate::remove_child(store, dir, name, options).await,
        Directory::Plain(node) => {
            if node.link(name).is_none() {
                return Err(ShardError::NoSuchLink {
                    name: name.to_string(),
                });
            }
            let links = node
                .into_links()
                .into_iter()
                .filter(|l| l.name != name)
                .collect();
            put_plain(store, links, options).await
        }
    }
}

pub async fn get_entry<S>(
    store: &S,
    dir: &Cid,
    name: &str,
    options: &ShardOptions,
) -> ShardResult<DagLink>
where
    S: NodeStore + ?Sized,
{
    validate_name(name)?;
    match open(store, dir).await? {
        Directory::Sharded(node) => {
            let path = resolve::resolve(store, &node, name, options.max_depth).await?;
            match path.target {
                resolve::Target::Found { link, .. } => Ok(link.to_link()),
                _ => Err(ShardError::NoSuchLink {
                    name: name.to_string(),
                }),
            }
        }
        Directory::Plain(node) => node.link(name).cloned().ok_or_else(|| ShardError::NoSuchLink {
            name: name.to_string(),
        }),
    }
}

/// Every entry of the directory, sorted by name.
///
/// Sharded directories are walked completely, one subshard at a time.
pub async fn list_entries<S>(store: &S, dir: &Cid) -> ShardResult<Vec<DagLink>>
where
    S: NodeStore + ?Sized,
{
    let root = match open(store, dir).await? {
        Directory::Plain(node) => return Ok(node.into_links()),
        Directory::Sharded(node) => node,
    };
    let (fanout, _) = shard::shard_params(&root)?;

    let mut entries = Vec::new();
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        for link in node.links() {
            match ShardLinkName::parse(&link.name, fanout)? {
                ShardLinkName::Leaf { name, .. } => {
                    entries.push(DagLink::new(name, link.size, link.cid));
                }
                ShardLinkName::Subshard { .. } => {
                    pending.push(shard::load(store, &link.cid).await?);
                }
            }
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
