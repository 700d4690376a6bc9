//! Pure classification of a probed node list into sync/fallback buckets.

use shardproxy_common::node::{NodeRecord, NodeRef, ShardId};
use shardproxy_common::{ProxyError, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// What to do with probed nodes whose shard is not part of the pool.
///
/// The install path (first load, reload) treats them as a configuration
/// mistake and rejects the whole list; the update path drops them so a noisy
/// probe sweep can never fail the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownShardPolicy {
    Reject,
    Drop,
}

/// The four disjoint buckets a probe sweep partitions into. Order within
/// each bucket follows the order of appearance in the probed list.
#[derive(Debug, Default)]
pub struct Classified {
    pub synced: Vec<NodeRef>,
    pub synced_fallback: Vec<NodeRef>,
    pub out_of_sync: Vec<NodeRef>,
    pub out_of_sync_fallback: Vec<NodeRef>,
}

/// Buckets `probed` on `(is_synced, is_fallback)` in a single pass.
///
/// Fails with [`ProxyError::WrongObserversConfiguration`] when the list is
/// empty or leaves a shard of `shard_ids` uncovered. Unknown shards are
/// handled per `policy`.
pub fn classify(
    probed: Vec<NodeRecord>,
    shard_ids: &[ShardId],
    policy: UnknownShardPolicy,
) -> Result<Classified> {
    if probed.is_empty() {
        return Err(ProxyError::WrongObserversConfiguration(
            "no observers to classify".to_string(),
        ));
    }

    let known: BTreeSet<ShardId> = shard_ids.iter().copied().collect();
    let mut covered: BTreeSet<ShardId> = BTreeSet::new();
    let mut classified = Classified::default();

    for node in probed {
        if !known.contains(&node.shard_id) {
            match policy {
                UnknownShardPolicy::Reject => {
                    return Err(ProxyError::WrongObserversConfiguration(format!(
                        "observer {} is configured for unknown shard {}",
                        node.address, node.shard_id
                    )));
                }
                UnknownShardPolicy::Drop => continue,
            }
        }
        covered.insert(node.shard_id);

        let node = Arc::new(node);
        match (node.is_synced, node.is_fallback) {
            (true, false) => classified.synced.push(node),
            (true, true) => classified.synced_fallback.push(node),
            (false, false) => classified.out_of_sync.push(node),
            (false, true) => classified.out_of_sync_fallback.push(node),
        }
    }

    for shard in known {
        if !covered.contains(&shard) {
            return Err(ProxyError::WrongObserversConfiguration(format!(
                "no observer configured for shard {shard}"
            )));
        }
    }

    Ok(classified)
}
