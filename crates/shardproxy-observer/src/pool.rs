//! Pool state: the classified node sequences, the published per-shard map
//! and the promote/demote machinery that keeps every shard offerable.

use shardproxy_common::node::{group_by_shard, NodeRecord, NodeRef, ShardId};
use shardproxy_common::{ProxyError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::classifier::Classified;
use crate::ordering::interleave_by_shard;

/// Which bucket a shard is currently served from, from richest to poorest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServeState {
    /// At least one synced regular observer.
    Regular,
    /// No synced regular; synced fallback observers stand in.
    Fallback,
    /// Neither; the last known synced observer is offered even though it may
    /// be stale, flagged `is_synced = false` so the caller can surface the
    /// staleness.
    Stale,
}

/// The mutable heart of the pool. All access is serialized by the
/// provider's read/write lock; methods here never block or suspend.
///
/// After every successful `install` or `update_sync_state`:
/// - `nodes_by_shard` has a non-empty entry for every shard of `shard_ids`,
/// - the four classified sequences are pairwise disjoint,
/// - sequences are freshly built, so snapshots handed out earlier stay valid.
#[derive(Debug, Default)]
pub(crate) struct PoolState {
    /// Fixed at the first successful install.
    shard_ids: Vec<ShardId>,
    /// Currently selectable nodes per shard.
    nodes_by_shard: BTreeMap<ShardId, Vec<NodeRef>>,
    synced: Vec<NodeRef>,
    synced_fallback: Vec<NodeRef>,
    out_of_sync: Vec<NodeRef>,
    out_of_sync_fallback: Vec<NodeRef>,
    /// Per shard, the most recent regular observer known to be synced.
    last_synced: BTreeMap<ShardId, NodeRef>,
    serve_states: BTreeMap<ShardId, ServeState>,
}

impl PoolState {
    pub(crate) fn is_installed(&self) -> bool {
        !self.shard_ids.is_empty()
    }

    pub(crate) fn shard_ids(&self) -> &[ShardId] {
        &self.shard_ids
    }

    /// Replaces the whole pool content on first load and on reload.
    ///
    /// Validate-then-install: every shard must be offerable from somewhere
    /// (synced regulars, synced fallbacks, or the remembered last synced
    /// observer) before any state is touched; otherwise the previous state
    /// survives untouched and the error is returned to the caller.
    pub(crate) fn install(&mut self, shard_ids: Vec<ShardId>, classified: Classified) -> Result<()> {
        let synced_by_shard = group_by_shard(&classified.synced);
        let fallback_by_shard = group_by_shard(&classified.synced_fallback);

        let mut planned: Vec<(ShardId, ServeState, Vec<NodeRef>)> =
            Vec::with_capacity(shard_ids.len());
        for &shard in &shard_ids {
            let (state, nodes) = if let Some(regulars) = synced_by_shard.get(&shard) {
                (ServeState::Regular, regulars.clone())
            } else if let Some(fallbacks) = fallback_by_shard.get(&shard) {
                (ServeState::Fallback, fallbacks.clone())
            } else if let Some(last) = self.last_synced.get(&shard) {
                (ServeState::Stale, vec![last.clone()])
            } else {
                return Err(ProxyError::WrongObserversConfiguration(format!(
                    "no selectable observer for shard {shard}"
                )));
            };
            planned.push((shard, state, nodes));
        }

        self.nodes_by_shard.clear();
        for (shard, state, nodes) in planned {
            self.nodes_by_shard.insert(shard, nodes);
            self.transition(shard, state);
        }
        for (&shard, regulars) in &synced_by_shard {
            if let Some(first) = regulars.first() {
                self.last_synced.insert(shard, first.clone());
            }
        }
        self.synced = interleave_by_shard(&synced_by_shard);
        self.synced_fallback = interleave_by_shard(&fallback_by_shard);
        self.out_of_sync = interleave_by_shard(&group_by_shard(&classified.out_of_sync));
        self.out_of_sync_fallback =
            interleave_by_shard(&group_by_shard(&classified.out_of_sync_fallback));
        self.shard_ids = shard_ids;
        Ok(())
    }

    /// Applies a fresh probe classification.
    ///
    /// Per shard: synced regulars win and refresh the last-synced memory;
    /// otherwise synced fallbacks are promoted; otherwise the last synced
    /// observer is served as a single stale stand-in. A shard with no
    /// candidate at all keeps its previously published list, so no update
    /// can drain a shard to empty.
    pub(crate) fn update_sync_state(&mut self, classified: Classified) {
        let synced_by_shard = group_by_shard(&classified.synced);
        let fallback_by_shard = group_by_shard(&classified.synced_fallback);

        let shard_ids = self.shard_ids.clone();
        for shard in shard_ids {
            if let Some(regulars) = synced_by_shard.get(&shard) {
                self.nodes_by_shard.insert(shard, regulars.clone());
                if let Some(first) = regulars.first() {
                    self.last_synced.insert(shard, first.clone());
                }
                self.transition(shard, ServeState::Regular);
            } else if let Some(fallbacks) = fallback_by_shard.get(&shard) {
                self.nodes_by_shard.insert(shard, fallbacks.clone());
                self.transition(shard, ServeState::Fallback);
            } else if let Some(last) = self.last_synced.get(&shard) {
                let stand_in = Arc::new(NodeRecord {
                    is_synced: false,
                    ..(**last).clone()
                });
                self.nodes_by_shard.insert(shard, vec![stand_in]);
                self.transition(shard, ServeState::Stale);
            } else {
                // Nothing to offer from this sweep and no memory either:
                // the previously published list stays in place.
                self.transition(shard, ServeState::Stale);
            }
        }

        self.synced = interleave_by_shard(&synced_by_shard);
        self.synced_fallback = interleave_by_shard(&fallback_by_shard);
        self.out_of_sync = interleave_by_shard(&group_by_shard(&classified.out_of_sync));
        self.out_of_sync_fallback =
            interleave_by_shard(&group_by_shard(&classified.out_of_sync_fallback));
    }

    fn transition(&mut self, shard: ShardId, next: ServeState) {
        let previous = self.serve_states.insert(shard, next);
        if previous == Some(next) {
            return;
        }
        match next {
            ServeState::Regular => {}
            ServeState::Fallback => {
                warn!(
                    "no synced regular observer left in shard {}, serving fallback observers",
                    shard
                );
            }
            ServeState::Stale => {
                warn!(
                    "no synced observer left in shard {}, serving the last known synced observer",
                    shard
                );
            }
        }
    }

    /// The selectable nodes of one shard, or `None` for an unknown shard.
    /// The returned snapshot stays valid across later updates.
    pub(crate) fn shard_nodes(&self, shard_id: ShardId) -> Option<Vec<NodeRef>> {
        self.nodes_by_shard.get(&shard_id).cloned()
    }

    /// Every currently synced node across all shards, regulars before
    /// promoted fallbacks, each group round-robin interleaved. Falls back to
    /// the published stand-ins when nothing at all is synced, so an
    /// installed pool never offers an empty list.
    pub(crate) fn all_selectable(&self) -> Vec<NodeRef> {
        let mut all = self.synced.clone();
        all.extend(self.synced_fallback.iter().cloned());
        if all.is_empty() {
            all = interleave_by_shard(&self.nodes_by_shard);
        }
        all
    }

    /// The full inventory with current sync flags: the four classified
    /// sequences concatenated.
    pub(crate) fn all_nodes(&self) -> Vec<NodeRef> {
        let mut all = self.synced.clone();
        all.extend(self.synced_fallback.iter().cloned());
        all.extend(self.out_of_sync.iter().cloned());
        all.extend(self.out_of_sync_fallback.iter().cloned());
        all
    }

    #[cfg(test)]
    pub(crate) fn synced(&self) -> &[NodeRef] {
        &self.synced
    }

    #[cfg(test)]
    pub(crate) fn synced_fallback(&self) -> &[NodeRef] {
        &self.synced_fallback
    }

    #[cfg(test)]
    pub(crate) fn out_of_sync(&self) -> &[NodeRef] {
        &self.out_of_sync
    }

    #[cfg(test)]
    pub(crate) fn out_of_sync_fallback(&self) -> &[NodeRef] {
        &self.out_of_sync_fallback
    }

    #[cfg(test)]
    pub(crate) fn serve_state(&self, shard_id: ShardId) -> Option<ServeState> {
        self.serve_states.get(&shard_id).copied()
    }
}
