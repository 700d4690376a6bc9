//! Observer pool for a sharded-chain request proxy.
//!
//! The proxy sits between external API clients and a network of backend
//! observer nodes partitioned into shards. This crate is the pool manager:
//! a dynamic registry that classifies observers by (shard, role, sync
//! state, fallback flag), hot-reloads from configuration and answers
//! selection queries from request handlers while a background prober keeps
//! the classification fresh.
//!
//! # Architecture
//!
//! - [`classifier`] - pure bucketing of a probed node list into
//!   synced / synced-fallback / out-of-sync / out-of-sync-fallback
//! - [`ordering`] - round-robin interleaving across shards, the order under
//!   which request dispatchers retry down the offer list
//! - [`provider`] - the [`ObserverPool`] facade: shared-lease reads from
//!   request handlers, exclusive-lease writes from the prober and from
//!   configuration reloads
//! - [`monitor`] - the periodic sweep feeding
//!   [`ObserverPool::update_sync_state`]
//!
//! # Availability
//!
//! The pool never leaves a shard without a candidate. When no regular
//! observer of a shard is synced, its synced fallback observers are
//! promoted; when those run out too, the last observer known to be synced
//! is offered as a single stale stand-in, flagged `is_synced = false` so
//! the caller can surface the staleness. A stale answer is strictly
//! preferable to a routing failure.
//!
//! # Example
//!
//! ```no_run
//! use shardproxy_observer::ObserverPool;
//!
//! # #[tokio::main]
//! # async fn main() -> shardproxy_common::Result<()> {
//! let pool = ObserverPool::from_file("config/observers.toml")?;
//!
//! // request handlers iterate the offer list and try each node in turn
//! for node in pool.observers(0).await? {
//!     println!("candidate for shard 0: {}", node.address);
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod monitor;
pub mod ordering;
mod pool;
pub mod provider;

pub use classifier::{classify, Classified, UnknownShardPolicy};
pub use monitor::{SyncMonitor, SyncMonitorConfig, SyncStatusFetcher};
pub use provider::ObserverPool;
