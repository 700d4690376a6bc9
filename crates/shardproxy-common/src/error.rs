use crate::node::ShardId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("observers for shard {0} not found")]
    UnknownShard(ShardId),

    #[error("no full history observer available for shard {0}")]
    NoFullHistoryNode(ShardId),

    #[error("wrong observers configuration: {0}")]
    WrongObserversConfiguration(String),
}

pub type Result<T> = std::result::Result<T, ProxyError>;
