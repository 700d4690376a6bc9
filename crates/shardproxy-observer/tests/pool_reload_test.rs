//! Reload and concurrency tests for the observer pool, driven through real
//! configuration files.

use shardproxy_common::node::NodeRole;
use shardproxy_common::{NodeRecord, METACHAIN_SHARD_ID};
use shardproxy_observer::ObserverPool;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// One observer per shard for shards 0, 1 and the metachain, plus a full
/// history node per shard.
const THREE_SHARDS: &str = r#"
[[Observers]]
ShardId = 0
Address = "http://observer-0:8080"

[[Observers]]
ShardId = 1
Address = "http://observer-1:8080"

[[Observers]]
ShardId = "metachain"
Address = "http://observer-meta:8080"

[[FullHistoryNodes]]
ShardId = 0
Address = "http://history-0:8080"

[[FullHistoryNodes]]
ShardId = 1
Address = "http://history-1:8080"

[[FullHistoryNodes]]
ShardId = "metachain"
Address = "http://history-meta:8080"
"#;

const TWO_SHARDS: &str = r#"
[[Observers]]
ShardId = 0
Address = "http://observer-0:8080"

[[Observers]]
ShardId = 1
Address = "http://observer-1:8080"
"#;

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("observers.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[tokio::test]
async fn test_from_file_installs_both_roles() {
    let (_dir, path) = write_config(THREE_SHARDS);
    let pool = ObserverPool::from_file(&path).unwrap();

    assert_eq!(pool.shard_ids().await, vec![0, 1, METACHAIN_SHARD_ID]);
    assert_eq!(
        pool.observers(METACHAIN_SHARD_ID).await.unwrap()[0].address,
        "http://observer-meta:8080"
    );
    assert_eq!(
        pool.full_history_observers(1).await.unwrap()[0].address,
        "http://history-1:8080"
    );
}

#[test]
fn test_from_missing_file_fails() {
    assert!(ObserverPool::from_file("no/such/observers.toml").is_err());
}

#[tokio::test]
async fn test_reload_same_shard_set_succeeds() {
    let (_dir, path) = write_config(THREE_SHARDS);
    let pool = ObserverPool::from_file(&path).unwrap();

    let status = pool.reload_nodes(NodeRole::Observer).await;
    assert!(status.ok, "{}", status.description);
    assert!(status.description.contains("http://observer-0:8080"));
    assert!(status.description.contains("http://observer-1:8080"));
    assert!(status.description.contains("http://observer-meta:8080"));
}

#[tokio::test]
async fn test_reload_different_shard_set_rejected() {
    let (_dir, path) = write_config(THREE_SHARDS);
    let pool = ObserverPool::from_file(&path).unwrap();

    // the rewritten file loses the metachain section
    std::fs::write(&path, TWO_SHARDS).unwrap();

    let status = pool.reload_nodes(NodeRole::Observer).await;
    assert!(!status.ok);
    assert!(status.description.contains("different number of shards"));

    // previous state survives: the metachain is still served
    let meta = pool.observers(METACHAIN_SHARD_ID).await.unwrap();
    assert_eq!(meta[0].address, "http://observer-meta:8080");
}

#[tokio::test]
async fn test_reload_missing_file_reports_path() {
    let (dir, path) = write_config(THREE_SHARDS);
    let pool = ObserverPool::from_file(&path).unwrap();
    drop(dir);

    let status = pool.reload_nodes(NodeRole::Observer).await;
    assert!(!status.ok);
    assert!(status.description.contains(path.to_str().unwrap()));

    // the pool keeps serving from the last good configuration
    assert!(pool.observers(0).await.is_ok());
}

#[tokio::test]
async fn test_reload_of_one_role_leaves_other_untouched() {
    let (_dir, path) = write_config(THREE_SHARDS);
    let pool = ObserverPool::from_file(&path).unwrap();

    let rewritten = THREE_SHARDS.replace("http://history-1:8080", "http://history-1b:8080");
    std::fs::write(&path, &rewritten).unwrap();

    let status = pool.reload_nodes(NodeRole::FullHistoryObserver).await;
    assert!(status.ok, "{}", status.description);

    assert_eq!(
        pool.full_history_observers(1).await.unwrap()[0].address,
        "http://history-1b:8080"
    );
    // the regular section was not reloaded
    assert_eq!(
        pool.observers(1).await.unwrap()[0].address,
        "http://observer-1:8080"
    );
}

#[tokio::test]
async fn test_reload_installs_initially_empty_full_history_section() {
    let (_dir, path) = write_config(TWO_SHARDS);
    let pool = ObserverPool::from_file(&path).unwrap();
    assert!(pool.full_history_observers(0).await.is_err());

    let with_history = format!(
        "{TWO_SHARDS}\n[[FullHistoryNodes]]\nShardId = 0\nAddress = \"http://history-0:8080\"\n"
    );
    std::fs::write(&path, &with_history).unwrap();

    let status = pool.reload_nodes(NodeRole::FullHistoryObserver).await;
    assert!(status.ok, "{}", status.description);
    assert_eq!(
        pool.full_history_observers(0).await.unwrap()[0].address,
        "http://history-0:8080"
    );
}

#[tokio::test]
async fn test_reload_rejects_emptied_section() {
    let (_dir, path) = write_config(THREE_SHARDS);
    let pool = ObserverPool::from_file(&path).unwrap();

    std::fs::write(&path, "").unwrap();

    let status = pool.reload_nodes(NodeRole::Observer).await;
    assert!(!status.ok);
    assert!(pool.observers(0).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_and_updates() {
    let (_dir, path) = write_config(THREE_SHARDS);
    let pool = Arc::new(ObserverPool::from_file(&path).unwrap());

    let mut tasks = tokio::task::JoinSet::new();

    for _ in 0..4 {
        let pool = pool.clone();
        tasks.spawn(async move {
            for _ in 0..200 {
                // every shard must stay offerable no matter how the
                // updater interleaves
                for shard in pool.shard_ids().await {
                    let nodes = pool.observers(shard).await.unwrap();
                    assert!(!nodes.is_empty());
                }
                assert!(!pool.all_observers().await.is_empty());
            }
        });
    }

    {
        let pool = pool.clone();
        tasks.spawn(async move {
            for round in 0..200 {
                let mut probed: Vec<NodeRecord> = pool
                    .nodes_with_sync_state()
                    .await
                    .iter()
                    .map(|n| (**n).clone())
                    .collect();
                // alternate between everything-synced and everything-stale
                for node in &mut probed {
                    node.is_synced = round % 2 == 0;
                }
                pool.update_sync_state(probed).await;
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }
}
