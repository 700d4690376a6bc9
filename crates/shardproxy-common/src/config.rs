//! Typed loader for the observers configuration file.
//!
//! The file is TOML with two top-level sections, `Observers` and
//! `FullHistoryNodes`, each a list of endpoint records. Unknown fields are
//! ignored so operators can annotate entries freely.

use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::node::{NodeRecord, NodeRole, ShardId, METACHAIN_SHARD_ID};

/// The parsed observers configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObserversConfig {
    /// Regular observers, holding the latest chain state.
    #[serde(rename = "Observers", default)]
    pub observers: Vec<ObserverEntry>,

    /// Archival observers for historical-block queries. May be empty.
    #[serde(rename = "FullHistoryNodes", default)]
    pub full_history_nodes: Vec<ObserverEntry>,
}

impl ObserversConfig {
    /// The entries of the section backing the given role.
    pub fn entries(&self, role: NodeRole) -> &[ObserverEntry] {
        match role {
            NodeRole::Observer => &self.observers,
            NodeRole::FullHistoryObserver => &self.full_history_nodes,
        }
    }

    /// Converts a section into node records. Freshly loaded nodes start out
    /// synced; the prober downgrades them once it has evidence.
    pub fn nodes(&self, role: NodeRole) -> Vec<NodeRecord> {
        self.entries(role)
            .iter()
            .map(|entry| entry.to_node(role))
            .collect()
    }
}

/// One endpoint record of a configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ObserverEntry {
    /// Shard the observer belongs to: an unsigned integer, or the string
    /// `"metachain"` for the coordinator shard.
    #[serde(rename = "ShardId", deserialize_with = "shard_id_or_sentinel")]
    pub shard_id: ShardId,

    /// Backend URL.
    #[serde(rename = "Address")]
    pub address: String,

    /// Standby node, only used when no regular node in its shard is synced.
    #[serde(rename = "IsFallback", default)]
    pub is_fallback: bool,
}

impl ObserverEntry {
    pub fn to_node(&self, role: NodeRole) -> NodeRecord {
        NodeRecord {
            address: self.address.clone(),
            shard_id: self.shard_id,
            is_synced: true,
            is_fallback: self.is_fallback,
            is_full_history: role == NodeRole::FullHistoryObserver,
        }
    }
}

fn shard_id_or_sentinel<'de, D>(deserializer: D) -> std::result::Result<ShardId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Id(ShardId),
        Name(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Id(id) => Ok(id),
        Raw::Name(name) if name.eq_ignore_ascii_case("metachain") => Ok(METACHAIN_SHARD_ID),
        Raw::Name(other) => Err(serde::de::Error::custom(format!(
            "unknown shard identifier {other:?}, expected an unsigned integer or \"metachain\""
        ))),
    }
}

/// Loads the configuration from a TOML file. Missing, unreadable or
/// malformed files produce a structured error; there are no retries.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<ObserversConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config = toml::from_str(&contents)?;
    Ok(config)
}
