//! Round-robin interleaving of per-shard node sequences.

use shardproxy_common::node::{NodeRef, ShardId};
use std::collections::BTreeMap;

/// Flattens a per-shard grouping into the order nodes are offered to
/// callers: the first node of every shard in ascending shard order, then the
/// second of every shard, and so on, skipping shards that have run out.
///
/// Request dispatchers retry down this list, so the interleave spreads load
/// across shards and across per-shard replicas at the same time. The
/// metachain sorts last because its sentinel identifier is the largest.
/// Equal inputs always produce the same ordering.
pub fn interleave_by_shard(nodes_by_shard: &BTreeMap<ShardId, Vec<NodeRef>>) -> Vec<NodeRef> {
    let total = nodes_by_shard.values().map(Vec::len).sum();
    let mut ordered = Vec::with_capacity(total);
    let mut position = 0;
    while ordered.len() < total {
        for shard_nodes in nodes_by_shard.values() {
            if let Some(node) = shard_nodes.get(position) {
                ordered.push(node.clone());
            }
        }
        position += 1;
    }
    ordered
}
