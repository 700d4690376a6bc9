//! Shared types for the shardproxy observer pool.
//!
//! shardproxy routes external API requests to a sharded network of backend
//! observer nodes. This crate carries the pieces every component agrees on:
//!
//! - [`node`] - the [`NodeRecord`] endpoint descriptor, shard identifiers
//!   and grouping helpers
//! - [`config`] - the typed TOML configuration the pool is (re)loaded from
//! - [`error`] - the [`ProxyError`] taxonomy and `Result` alias
//! - [`reload`] - the status record a configuration reload reports back

pub mod config;
pub mod error;
pub mod node;
pub mod reload;

pub use error::{ProxyError, Result};
pub use node::{NodeRecord, NodeRef, NodeRole, ShardId, METACHAIN_SHARD_ID};
pub use reload::ReloadStatus;
