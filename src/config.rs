//! Server configuration
//!
//! Every option can come from the command line or the environment. The
//! binary loads a `.env` file from the working directory into the
//! environment before parsing, without overriding variables that are
//! already set. The MongoDB connection settings are only required when the
//! server is not running against the in-memory store.

use clap::Parser;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors reported at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MONGODB_URI environment variable must be set")]
    MissingUri,

    #[error("MONGODB_DB_NAME environment variable must be set")]
    MissingDbName,

    #[error("call timeout must be greater than zero")]
    ZeroTimeout,
}

/// MCP server exposing MongoDB operations and a business insights memo
#[derive(Debug, Clone, Parser)]
#[command(name = "mcp-server-mongodb")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// Database all tools operate on
    #[arg(long, env = "MONGODB_DB_NAME")]
    pub db_name: Option<String>,

    /// Serve from a process-local store instead of MongoDB
    #[arg(long, env = "MCP_MONGODB_IN_MEMORY")]
    pub in_memory: bool,

    /// Abort database calls that take longer than this many seconds
    #[arg(long, env = "MCP_MONGODB_CALL_TIMEOUT_SECS")]
    pub call_timeout_secs: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "MCP_MONGODB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Which document store backs the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Mongo { uri: String, db_name: String },
    InMemory,
}

impl Config {
    /// Resolve the store selection, checking required connection settings
    pub fn store(&self) -> Result<StoreConfig, ConfigError> {
        if self.in_memory {
            return Ok(StoreConfig::InMemory);
        }

        let uri = non_empty(&self.mongodb_uri).ok_or(ConfigError::MissingUri)?;
        let db_name = non_empty(&self.db_name).ok_or(ConfigError::MissingDbName)?;

        Ok(StoreConfig::Mongo {
            uri: uri.to_string(),
            db_name: db_name.to_string(),
        })
    }

    /// Per-call timeout; `None` waits indefinitely
    pub fn call_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        match self.call_timeout_secs {
            Some(0) => Err(ConfigError::ZeroTimeout),
            Some(secs) => Ok(Some(Duration::from_secs(secs))),
            None => Ok(None),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
