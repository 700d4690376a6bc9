use shardproxy_common::node::NodeRecord;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::provider::ObserverPool;

/// Source of per-node sync verdicts.
///
/// Implementations ask the backend whether it is at the chain tip (the
/// actual wire call lives with the HTTP client, outside this crate). A probe
/// that fails counts as out of sync.
pub trait SyncStatusFetcher: Send + Sync + 'static {
    fn is_synced(&self, node: &NodeRecord) -> impl Future<Output = bool> + Send;
}

/// Sync monitor configuration.
#[derive(Debug, Clone)]
pub struct SyncMonitorConfig {
    pub interval: Duration,
}

impl Default for SyncMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// Periodic prober feeding the pool's sync-state updates.
///
/// Each sweep snapshots the pool inventory, probes every node concurrently
/// and submits one fresh list; the pool applies it atomically under its
/// write lock. Probing happens entirely outside any lease.
pub struct SyncMonitor<F> {
    pool: Arc<ObserverPool>,
    fetcher: F,
    config: SyncMonitorConfig,
}

impl<F: SyncStatusFetcher> SyncMonitor<F> {
    pub fn new(pool: Arc<ObserverPool>, fetcher: F, config: SyncMonitorConfig) -> Self {
        Self {
            pool,
            fetcher,
            config,
        }
    }

    /// Starts the monitor task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        let mut interval = tokio::time::interval(self.config.interval);
        loop {
            interval.tick().await;
            self.sweep().await;
        }
    }

    /// One probe pass over every known node of both roles.
    pub async fn sweep(&self) {
        let nodes = self.pool.nodes_with_sync_state().await;
        if nodes.is_empty() {
            return;
        }

        let fetcher = &self.fetcher;
        let checks = nodes.into_iter().map(|node| async move {
            let is_synced = fetcher.is_synced(&node).await;
            (node, is_synced)
        });
        let results = futures::future::join_all(checks).await;

        let probed: Vec<NodeRecord> = results
            .into_iter()
            .map(|(node, is_synced)| {
                let mut record = (*node).clone();
                record.is_synced = is_synced;
                record
            })
            .collect();

        debug!("submitting sync sweep of {} nodes", probed.len());
        self.pool.update_sync_state(probed).await;
    }
}
