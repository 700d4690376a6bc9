//! The observer pool facade consumed by request handlers and the prober.

use shardproxy_common::config::{self, ObserversConfig};
use shardproxy_common::node::{shard_ids_of, NodeRecord, NodeRef, NodeRole, ShardId};
use shardproxy_common::{ProxyError, ReloadStatus, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::classifier::{classify, UnknownShardPolicy};
use crate::pool::PoolState;

/// Shard-partitioned registry of backend observers.
///
/// One pool state per role: regular observers and full-history observers
/// come from separate configuration sections and reload independently.
/// Readers (request handlers) take a shared lease, the single writer (the
/// sync prober, or an operator-triggered reload) takes an exclusive one;
/// nothing suspends while a lease is held and the reload's disk read
/// happens before its lease is taken.
///
/// Once a pool is installed it always offers at least one node per shard,
/// even when every node of a shard is out of sync; see
/// [`ObserverPool::update_sync_state`].
#[derive(Debug)]
pub struct ObserverPool {
    configuration_path: PathBuf,
    observers: RwLock<PoolState>,
    full_history: RwLock<PoolState>,
}

impl ObserverPool {
    /// Loads the configuration file and installs both pools.
    ///
    /// The `Observers` section must cover at least one shard; an empty
    /// `FullHistoryNodes` section leaves that pool uninstalled and every
    /// full-history query answers [`ProxyError::NoFullHistoryNode`].
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = config::load_from_file(&path)?;
        Self::new(config, path)
    }

    /// Installs both pools from an already parsed configuration.
    pub fn new(config: ObserversConfig, configuration_path: impl Into<PathBuf>) -> Result<Self> {
        let mut observers = PoolState::default();
        let nodes = config.nodes(NodeRole::Observer);
        let shard_ids = shard_ids_of(&nodes);
        observers.install(
            shard_ids.clone(),
            classify(nodes, &shard_ids, UnknownShardPolicy::Reject)?,
        )?;

        let mut full_history = PoolState::default();
        let nodes = config.nodes(NodeRole::FullHistoryObserver);
        if !nodes.is_empty() {
            let shard_ids = shard_ids_of(&nodes);
            full_history.install(
                shard_ids.clone(),
                classify(nodes, &shard_ids, UnknownShardPolicy::Reject)?,
            )?;
        }

        Ok(Self {
            configuration_path: configuration_path.into(),
            observers: RwLock::new(observers),
            full_history: RwLock::new(full_history),
        })
    }

    /// The selectable observers of one shard, in offer order. The caller
    /// iterates and tries each until one answers.
    pub async fn observers(&self, shard_id: ShardId) -> Result<Vec<NodeRef>> {
        self.observers
            .read()
            .await
            .shard_nodes(shard_id)
            .ok_or(ProxyError::UnknownShard(shard_id))
    }

    /// The selectable full-history observers of one shard.
    pub async fn full_history_observers(&self, shard_id: ShardId) -> Result<Vec<NodeRef>> {
        self.full_history
            .read()
            .await
            .shard_nodes(shard_id)
            .ok_or(ProxyError::NoFullHistoryNode(shard_id))
    }

    /// Every currently selectable observer across all shards, round-robin
    /// interleaved, regulars before promoted fallbacks. Never fails.
    pub async fn all_observers(&self) -> Vec<NodeRef> {
        self.observers.read().await.all_selectable()
    }

    /// The full node inventory (both roles) with current sync flags, as fed
    /// back to the prober.
    pub async fn nodes_with_sync_state(&self) -> Vec<NodeRef> {
        let mut nodes = self.observers.read().await.all_nodes();
        nodes.extend(self.full_history.read().await.all_nodes());
        nodes
    }

    /// The shard set fixed at the first load.
    pub async fn shard_ids(&self) -> Vec<ShardId> {
        self.observers.read().await.shard_ids().to_vec()
    }

    /// Applies a probe sweep. Never fails the caller: nodes of unknown
    /// shards are dropped, and a sweep that cannot be classified at all is
    /// logged and discarded, leaving the previous state in place.
    pub async fn update_sync_state(&self, probed: Vec<NodeRecord>) {
        let (history, regular): (Vec<NodeRecord>, Vec<NodeRecord>) =
            probed.into_iter().partition(|node| node.is_full_history);

        Self::update_pool(&self.observers, regular, NodeRole::Observer).await;
        Self::update_pool(&self.full_history, history, NodeRole::FullHistoryObserver).await;
    }

    async fn update_pool(pool: &RwLock<PoolState>, probed: Vec<NodeRecord>, role: NodeRole) {
        let mut state = pool.write().await;
        if !state.is_installed() {
            return;
        }
        match classify(probed, state.shard_ids(), UnknownShardPolicy::Drop) {
            Ok(classified) => state.update_sync_state(classified),
            Err(err) => error!("cannot update sync state of {} nodes: {}", role, err),
        }
    }

    /// Re-reads the configuration file and reinstalls the section backing
    /// `role`; the other section is left untouched. The shard set is fixed
    /// at the first load, so a file spanning a different set is rejected
    /// and the previous state survives intact.
    pub async fn reload_nodes(&self, role: NodeRole) -> ReloadStatus {
        // disk I/O before the write lease
        let config = match config::load_from_file(&self.configuration_path) {
            Ok(config) => config,
            Err(err) => {
                return ReloadStatus::failed(format!(
                    "cannot load observers configuration file {}: {}",
                    self.configuration_path.display(),
                    err
                ));
            }
        };

        let nodes = config.nodes(role);
        if nodes.is_empty() {
            return ReloadStatus::failed(format!(
                "configuration file {} defines no {} entries",
                self.configuration_path.display(),
                role
            ));
        }
        let new_shard_ids = shard_ids_of(&nodes);

        let pool = match role {
            NodeRole::Observer => &self.observers,
            NodeRole::FullHistoryObserver => &self.full_history,
        };
        let mut state = pool.write().await;
        if state.is_installed() && state.shard_ids() != new_shard_ids.as_slice() {
            return ReloadStatus::failed(format!(
                "the new configuration contains a different number of shards or different \
                 shard identifiers: expected {:?}, got {:?}",
                state.shard_ids(),
                new_shard_ids
            ));
        }

        let classified = match classify(nodes.clone(), &new_shard_ids, UnknownShardPolicy::Reject)
        {
            Ok(classified) => classified,
            Err(err) => {
                error!("reload of {} nodes rejected: {}", role, err);
                return ReloadStatus::failed(err.to_string());
            }
        };
        if let Err(err) = state.install(new_shard_ids, classified) {
            error!("reload of {} nodes rejected: {}", role, err);
            return ReloadStatus::failed(err.to_string());
        }
        drop(state);

        info!(
            "reloaded {} nodes from {}",
            role,
            self.configuration_path.display()
        );
        ReloadStatus::succeeded(reload_description(role, &nodes))
    }
}

/// Operator-facing summary of a successful reload: every installed address,
/// grouped by shard.
fn reload_description(role: NodeRole, nodes: &[NodeRecord]) -> String {
    let mut by_shard: BTreeMap<ShardId, Vec<&str>> = BTreeMap::new();
    for node in nodes {
        by_shard
            .entry(node.shard_id)
            .or_default()
            .push(node.address.as_str());
    }
    let sections: Vec<String> = by_shard
        .iter()
        .map(|(shard, addresses)| format!("shard {}: [{}]", shard, addresses.join(", ")))
        .collect();
    format!("reloaded {} configuration: {}", role, sections.join("; "))
}
