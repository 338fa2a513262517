mod common;

use common::{entries, file_link, memory_store, options};
use dagshard_core::{DagStore, testutil::CountingNodeStore};
use dagshard_fs::{add_child, build_shard, debug::collect_cids, lookup, remove_child, resolve};

#[tokio::test]
async fn test_lookup_loads_only_the_path() -> anyhow::Result<()> {
    let store = memory_store();
    let options = options(16);
    let built = build_shard(store.as_ref(), &entries(800), &options).await?;
    let total_levels = collect_cids(store.as_ref(), &built.cid).await?.len();

    let counting = CountingNodeStore::new(DagStore::clone(&store));
    for name in ["file_00000.bin", "file_00421.bin", "file_00799.bin"] {
        let path = resolve(store.as_ref(), &built.node, name, options.max_depth).await?;
        counting.reset();
        lookup(&counting, &built.cid, name, options.max_depth).await?;
        // The root plus one read per subshard on the way down.
        assert_eq!(counting.gets(), path.segments.len());
        assert!(counting.gets() < total_levels);
        assert_eq!(counting.puts(), 0);
    }
    Ok(())
}

#[tokio::test]
async fn test_mutation_rewrites_only_the_path() -> anyhow::Result<()> {
    let store = memory_store();
    let options = options(16);
    let built = build_shard(store.as_ref(), &entries(800), &options).await?;
    let before = collect_cids(store.as_ref(), &built.cid).await?;

    let counting = CountingNodeStore::new(DagStore::clone(&store));
    let removed = remove_child(&counting, &built.cid, "file_00123.bin", &options).await?;
    let reads = counting.gets();
    assert!(counting.puts() <= reads);

    let after = collect_cids(store.as_ref(), &removed.cid).await?;
    let rewritten = after.difference(&before).count();
    assert!(rewritten <= reads);
    assert!(after.intersection(&before).count() >= after.len() - rewritten);

    counting.reset();
    let added = add_child(
        &counting,
        &removed.cid,
        "file_00123.bin",
        &file_link("file_00123.bin", 124),
        &options,
    )
    .await?;
    assert_eq!(added.cid, built.cid);
    assert!(counting.gets() < before.len());
    Ok(())
}
