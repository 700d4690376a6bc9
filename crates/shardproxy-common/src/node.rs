use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identifier of a chain shard.
pub type ShardId = u32;

/// Sentinel shard identifier of the metachain (the coordinator shard that
/// notarizes the others). Sorts after every regular shard, which is also the
/// position it takes in selection orderings.
pub const METACHAIN_SHARD_ID: ShardId = ShardId::MAX;

/// Shared handle to a node record.
///
/// Records inside the pool are effectively immutable: updates replace whole
/// sequences rather than mutating elements, so snapshots handed to readers
/// are plain pointer copies that stay valid across later updates.
pub type NodeRef = Arc<NodeRecord>;

/// Which configuration section a node was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Regular observer, holds the latest chain state.
    Observer,
    /// Archival observer, answers historical-block queries.
    FullHistoryObserver,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Observer => write!(f, "observer"),
            NodeRole::FullHistoryObserver => write!(f, "full history observer"),
        }
    }
}

/// An observer endpoint descriptor.
///
/// `address`, `shard_id`, `is_fallback` and `is_full_history` are static from
/// configuration; only `is_synced` changes over a record's lifetime, and it
/// changes by replacement: the prober submits fresh records, the pool never
/// mutates a published one in place.
///
/// Two records are equal when they describe the same endpoint, i.e. equality
/// is by `(address, shard_id)`; the sync and fallback flags do not
/// participate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Backend URL, unique within the pool.
    pub address: String,
    /// Shard the node belongs to.
    pub shard_id: ShardId,
    /// Last probe verdict: the node is at the chain tip. Nodes start out
    /// synced when loaded from configuration.
    pub is_synced: bool,
    /// Standby node, only served when no regular node in its shard is synced.
    pub is_fallback: bool,
    /// Retains archival state.
    pub is_full_history: bool,
}

impl NodeRecord {
    pub fn new(address: impl Into<String>, shard_id: ShardId) -> Self {
        Self {
            address: address.into(),
            shard_id,
            is_synced: true,
            is_fallback: false,
            is_full_history: false,
        }
    }

    pub fn with_fallback(mut self) -> Self {
        self.is_fallback = true;
        self
    }

    pub fn with_full_history(mut self) -> Self {
        self.is_full_history = true;
        self
    }
}

impl PartialEq for NodeRecord {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.shard_id == other.shard_id
    }
}

impl Eq for NodeRecord {}

impl Hash for NodeRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.shard_id.hash(state);
    }
}

/// Groups nodes by shard, preserving the order of appearance within each
/// shard. The `BTreeMap` keys iterate in ascending shard order, which places
/// the metachain last.
pub fn group_by_shard(nodes: &[NodeRef]) -> BTreeMap<ShardId, Vec<NodeRef>> {
    let mut grouped: BTreeMap<ShardId, Vec<NodeRef>> = BTreeMap::new();
    for node in nodes {
        grouped.entry(node.shard_id).or_default().push(node.clone());
    }
    grouped
}

/// The sorted, deduplicated set of shards spanned by a node list.
pub fn shard_ids_of(nodes: &[NodeRecord]) -> Vec<ShardId> {
    let mut shard_ids: Vec<ShardId> = nodes.iter().map(|node| node.shard_id).collect();
    shard_ids.sort_unstable();
    shard_ids.dedup();
    shard_ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_record_creation() {
        let node = NodeRecord::new("http://10.0.0.1:8080", 0);
        assert_eq!(node.address, "http://10.0.0.1:8080");
        assert_eq!(node.shard_id, 0);
        assert!(node.is_synced);
        assert!(!node.is_fallback);
        assert!(!node.is_full_history);
    }

    #[test]
    fn test_node_record_builders() {
        let node = NodeRecord::new("addr", METACHAIN_SHARD_ID)
            .with_fallback()
            .with_full_history();
        assert!(node.is_fallback);
        assert!(node.is_full_history);
        assert_eq!(node.shard_id, METACHAIN_SHARD_ID);
    }

    #[test]
    fn test_equality_ignores_sync_state() {
        let mut a = NodeRecord::new("addr", 1);
        let b = NodeRecord::new("addr", 1);
        a.is_synced = false;
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_distinguishes_shard() {
        let a = NodeRecord::new("addr", 0);
        let b = NodeRecord::new("addr", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_group_by_shard_preserves_order_and_sorts_shards() {
        let nodes: Vec<NodeRef> = vec![
            Arc::new(NodeRecord::new("m0", METACHAIN_SHARD_ID)),
            Arc::new(NodeRecord::new("a0", 0)),
            Arc::new(NodeRecord::new("b0", 1)),
            Arc::new(NodeRecord::new("a1", 0)),
        ];

        let grouped = group_by_shard(&nodes);
        let shards: Vec<ShardId> = grouped.keys().copied().collect();
        assert_eq!(shards, vec![0, 1, METACHAIN_SHARD_ID]);

        let shard0: Vec<&str> = grouped[&0].iter().map(|n| n.address.as_str()).collect();
        assert_eq!(shard0, vec!["a0", "a1"]);
    }

    #[test]
    fn test_shard_ids_of_sorted_and_deduplicated() {
        let nodes = vec![
            NodeRecord::new("m", METACHAIN_SHARD_ID),
            NodeRecord::new("b", 1),
            NodeRecord::new("a", 0),
            NodeRecord::new("a2", 0),
        ];
        assert_eq!(shard_ids_of(&nodes), vec![0, 1, METACHAIN_SHARD_ID]);
    }

    #[test]
    fn test_node_role_display() {
        assert_eq!(NodeRole::Observer.to_string(), "observer");
        assert_eq!(
            NodeRole::FullHistoryObserver.to_string(),
            "full history observer"
        );
    }
}
