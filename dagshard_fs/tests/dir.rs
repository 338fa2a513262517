mod common;

use common::{entry, file_link, init_tracing, memory_store};
use dagshard_core::{DagLink, DagNode, NodeStore, PutOptions};
use dagshard_fs::{
    Directory, DirKind, DirMeta, ShardError, ShardOptions, add_entry, build_shard, create_dir,
    get_entry, kind_of, list_entries, remove_entry,
};
use dagshard_store_local::LocalStore;

fn threshold(n: usize) -> ShardOptions {
    ShardOptions {
        shard_split_threshold: n,
        fanout: 16,
        ..ShardOptions::default()
    }
}

#[tokio::test]
async fn test_threshold_transition() -> anyhow::Result<()> {
    init_tracing();
    let store = memory_store();
    let options = threshold(8);
    let mut root = create_dir(store.as_ref(), &options).await?.cid;
    for i in 0..8 {
        let name = format!("e{i}");
        root = add_entry(store.as_ref(), &root, &name, &file_link(&name, 1), &options)
            .await?
            .cid;
    }
    assert_eq!(kind_of(store.as_ref(), &root).await?, DirKind::Directory);

    // Replacing an entry does not grow the directory.
    root = add_entry(store.as_ref(), &root, "e3", &file_link("v2", 2), &options)
        .await?
        .cid;
    assert_eq!(kind_of(store.as_ref(), &root).await?, DirKind::Directory);
    assert_eq!(get_entry(store.as_ref(), &root, "e3", &options).await?.size, 2);

    let sharded = add_entry(store.as_ref(), &root, "e8", &file_link("e8", 1), &options).await?;
    assert_eq!(
        DirMeta::unmarshal(sharded.node.data())?.kind,
        DirKind::HamtShard
    );

    let listed = list_entries(store.as_ref(), &sharded.cid).await?;
    let names: Vec<_> = listed.iter().map(|l| l.name.clone()).collect();
    let expected: Vec<_> = (0..9).map(|i| format!("e{i}")).collect();
    assert_eq!(names, expected);
    Ok(())
}

#[tokio::test]
async fn test_conversion_equals_direct_build() -> anyhow::Result<()> {
    let store = memory_store();
    let options = threshold(3);
    let mut root = create_dir(store.as_ref(), &options).await?.cid;
    let mut all = Vec::new();
    for i in 0..10 {
        let link = entry(&format!("f{i}"), i);
        root = add_entry(store.as_ref(), &root, &link.name, &link, &options)
            .await?
            .cid;
        all.push(link);
    }
    let direct = build_shard(store.as_ref(), &all, &options).await?;
    assert_eq!(root, direct.cid);
    Ok(())
}

#[tokio::test]
async fn test_sharded_directory_stays_sharded() -> anyhow::Result<()> {
    let store = memory_store();
    let options = threshold(2);
    let mut root = create_dir(store.as_ref(), &options).await?.cid;
    for name in ["x", "y", "z"] {
        root = add_entry(store.as_ref(), &root, name, &file_link(name, 1), &options)
            .await?
            .cid;
    }
    for name in ["x", "y", "z"] {
        root = remove_entry(store.as_ref(), &root, name, &options).await?.cid;
    }
    assert_eq!(kind_of(store.as_ref(), &root).await?, DirKind::HamtShard);
    assert!(list_entries(store.as_ref(), &root).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_plain_directory_entries() -> anyhow::Result<()> {
    let store = memory_store();
    let options = ShardOptions::default();
    let root = create_dir(store.as_ref(), &options).await?.cid;
    let root = add_entry(store.as_ref(), &root, "b", &file_link("b", 2), &options)
        .await?
        .cid;
    let root = add_entry(store.as_ref(), &root, "a", &file_link("a", 1), &options)
        .await?
        .cid;

    let names: Vec<_> = list_entries(store.as_ref(), &root)
        .await?
        .into_iter()
        .map(|l| l.name)
        .collect();
    assert_eq!(names, ["a", "b"]);

    let err = remove_entry(store.as_ref(), &root, "missing", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ShardError::NoSuchLink { .. }));
    let err = get_entry(store.as_ref(), &root, "missing", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ShardError::NoSuchLink { .. }));

    let root = remove_entry(store.as_ref(), &root, "a", &options).await?.cid;
    assert_eq!(list_entries(store.as_ref(), &root).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_file_nodes_are_not_directories() -> anyhow::Result<()> {
    let store = memory_store();
    let node = DagNode::new(DirMeta::file().marshal()?, Vec::<DagLink>::new())?;
    let cid = store.put_node(&node, &PutOptions::default()).await?;

    assert!(matches!(
        Directory::from_node(node),
        Err(ShardError::InvalidArgument(_))
    ));
    let err = add_entry(
        store.as_ref(),
        &cid,
        "x",
        &file_link("x", 1),
        &ShardOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ShardError::InvalidArgument(_)));
    assert_eq!(kind_of(store.as_ref(), &cid).await?, DirKind::File);
    Ok(())
}

#[tokio::test]
async fn test_local_store_persists_shards() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let options = threshold(4);

    let root = {
        let store = LocalStore::new(tmp.path()).to_dag_store();
        let mut root = create_dir(&store, &options).await?.cid;
        for i in 0..40 {
            let name = format!("doc-{i}.txt");
            root = add_entry(&store, &root, &name, &file_link(&name, i), &options)
                .await?
                .cid;
        }
        root
    };

    let reopened = LocalStore::new(tmp.path()).to_dag_store();
    assert_eq!(kind_of(&reopened, &root).await?, DirKind::HamtShard);
    let listed = list_entries(&reopened, &root).await?;
    assert_eq!(listed.len(), 40);
    assert_eq!(
        get_entry(&reopened, &root, "doc-7.txt", &options).await?.size,
        7
    );
    Ok(())
}
