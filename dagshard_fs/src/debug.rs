use std::collections::BTreeSet;
use std::fmt::Write as _;

use dagshard_core::{Cid, DagLink, DagNode, NodeStore};

use crate::{
    ShardResult,
    link_name::ShardLinkName,
    meta::{DirKind, DirMeta},
    shard,
};

/// Shape of a sharded directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardStats {
    /// Number of distinct depths holding at least one level.
    pub levels: usize,
    pub subshards: usize,
    pub leaves: usize,
    pub max_depth: usize,
    /// Subshards (root excluded) holding exactly one leaf and nothing else.
    pub single_leaf_subshards: usize,
}

/// Renders the directory rooted at `root` as a tree, one line per link.
///
/// Plain directories print their entries; sharded ones print every level.
pub async fn render_tree<S>(store: &S, root: &Cid) -> ShardResult<String>
where
    S: NodeStore + ?Sized,
{
    let root_node = shard::load(store, root).await?;
    let meta = DirMeta::unmarshal(root_node.data())?;
    let mut out = String::new();

    let fanout = match meta.kind {
        DirKind::HamtShard => {
            let (fanout, hash_fn) = meta.shard_params()?;
            let _ = writeln!(
                out,
                "{} [shard fanout={} hash={:?} links={}]",
                root.fmt_short(),
                fanout,
                hash_fn,
                root_node.links().len()
            );
            fanout
        }
        kind => {
            let _ = writeln!(
                out,
                "{} [{:?} entries={}]",
                root.fmt_short(),
                kind,
                root_node.links().len()
            );
            for (i, link) in root_node.links().iter().enumerate() {
                let branch = if i + 1 == root_node.links().len() {
                    "└── "
                } else {
                    "├── "
                };
                let _ = writeln!(out, "{branch}{}", describe_entry(&link.name, link));
            }
            return Ok(out);
        }
    };

    struct Frame {
        node: DagNode,
        prefix: String,
        index: usize,
    }

    let mut stack = vec![Frame {
        node: root_node,
        prefix: String::new(),
        index: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        if frame.index >= frame.node.links().len() {
            stack.pop();
            continue;
        }
        let link = frame.node.links()[frame.index].clone();
        let is_last = frame.index + 1 == frame.node.links().len();
        frame.index += 1;

        let (branch, child_piece) = if is_last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let line_prefix = format!("{}{}", frame.prefix, branch);
        let child_prefix = format!("{}{}", frame.prefix, child_piece);

        match ShardLinkName::parse(&link.name, fanout)? {
            ShardLinkName::Leaf { name, .. } => {
                let _ = writeln!(
                    out,
                    "{line_prefix}{} -> {}",
                    link.name,
                    describe_entry(&name, &link)
                );
            }
            ShardLinkName::Subshard { .. } => {
                let _ = writeln!(
                    out,
                    "{line_prefix}{} [subshard size={} cid={}]",
                    link.name,
                    link.size,
                    link.cid.fmt_short()
                );
                match shard::load(store, &link.cid).await {
                    Ok(node) => stack.push(Frame {
                        node,
                        prefix: child_prefix,
                        index: 0,
                    }),
                    Err(err) => {
                        let _ = writeln!(out, "{child_prefix}[BROKEN SUBSHARD: {err}]");
                    }
                }
            }
        }
    }

    Ok(out)
}

fn describe_entry(name: &str, link: &DagLink) -> String {
    format!("{name} [size={} cid={}]", link.size, link.cid.fmt_short())
}

/// Identifiers of the root and every subshard reachable from it.
///
/// Entry targets are not included; they are not part of the directory
/// structure.
pub async fn collect_cids<S>(store: &S, root: &Cid) -> ShardResult<BTreeSet<Cid>>
where
    S: NodeStore + ?Sized,
{
    let mut cids = BTreeSet::new();
    walk(store, root, |cid, _, _| {
        cids.insert(*cid);
    })
    .await?;
    Ok(cids)
}

pub async fn shard_stats<S>(store: &S, root: &Cid) -> ShardResult<ShardStats>
where
    S: NodeStore + ?Sized,
{
    let mut stats = ShardStats::default();
    let mut depths = BTreeSet::new();
    walk(store, root, |_, depth, node| {
        depths.insert(depth);
        stats.max_depth = stats.max_depth.max(depth);
        if depth > 0 {
            stats.subshards += 1;
        }
        let leaves = node.links().iter().filter(|l| l.name.len() > 2).count();
        stats.leaves += leaves;
        if depth > 0 && leaves == 1 && node.links().len() == 1 {
            stats.single_leaf_subshards += 1;
        }
    })
    .await?;
    stats.levels = depths.len();
    Ok(stats)
}

/// Visits every shard level below `root`, depth first.
async fn walk<S, F>(store: &S, root: &Cid, mut visit: F) -> ShardResult<()>
where
    S: NodeStore + ?Sized,
    F: FnMut(&Cid, usize, &DagNode),
{
    let root_node = shard::load(store, root).await?;
    let (fanout, _) = shard::shard_params(&root_node)?;
    let mut pending = vec![(*root, 0usize, root_node)];
    while let Some((cid, depth, node)) = pending.pop() {
        visit(&cid, depth, &node);
        for link in node.links() {
            if let ShardLinkName::Subshard { .. } = ShardLinkName::parse(&link.name, fanout)? {
                let child = shard::load(store, &link.cid).await?;
                pending.push((link.cid, depth + 1, child));
            }
        }
    }
    Ok(())
}
