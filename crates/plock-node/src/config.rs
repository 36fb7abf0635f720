//! Configuration types for service nodes and the submission client.
//!
//! Both are plain values built once at startup and handed to whatever needs
//! them. Nothing reads process-wide state after construction.

use crate::error::{NodeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default connect timeout for outbound dials.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for reading one message line.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the record format version.
pub const ENV_RECORD_VERSION: &str = "PLOCK_DEPLOYMENT_RECORD_VERSION";

/// Environment variable holding the service `host:port`.
pub const ENV_SERVICE_ADDRESS: &str = "PLOCK_SERVICE_ADDRESS";

/// Service node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Interface to listen on; also the host part of the advertised address.
    pub host: String,

    /// Port to listen on. `0` picks an ephemeral port.
    pub port: u16,

    /// Peer to dial once at startup.
    pub bootstrap: Option<String>,

    /// Directory holding the chain database.
    pub data_dir: PathBuf,

    /// Connect timeout for every outbound dial.
    pub dial_timeout: Duration,

    /// Timeout for reading a single message line.
    pub read_timeout: Duration,

    /// Upper bound on concurrent gossip dials per flood.
    pub max_in_flight_dials: usize,

    /// Maximum number of pending records.
    pub mempool_capacity: usize,

    /// Verify record signatures before mempool admission.
    pub verify_signatures: bool,

    /// Format version written into block headers.
    pub block_version: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            bootstrap: None,
            data_dir: PathBuf::from("data"),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_in_flight_dials: 4,
            mempool_capacity: plock_chain::mempool::DEFAULT_CAPACITY,
            verify_signatures: true,
            block_version: plock_chain::block::BLOCK_VERSION,
        }
    }
}

impl NodeConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listen host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the listen port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the bootstrap peer.
    pub fn with_bootstrap(mut self, bootstrap: impl Into<String>) -> Self {
        self.bootstrap = Some(bootstrap.into());
        self
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the dial and read timeouts.
    pub fn with_timeouts(mut self, dial: Duration, read: Duration) -> Self {
        self.dial_timeout = dial;
        self.read_timeout = read;
        self
    }

    /// Set the mempool capacity.
    pub fn with_mempool_capacity(mut self, capacity: usize) -> Self {
        self.mempool_capacity = capacity;
        self
    }

    /// Enable or disable signature verification.
    pub fn with_signature_verification(mut self, enabled: bool) -> Self {
        self.verify_signatures = enabled;
        self
    }

    /// `host:port` this node listens on, as configured.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Location of the chain database inside `data_dir`.
    pub fn chain_path(&self) -> PathBuf {
        self.data_dir.join("chain")
    }

    /// Checks values that would otherwise fail late.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Config` for a zero dial limit, a zero mempool
    /// capacity, or a bootstrap address without a port.
    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight_dials == 0 {
            return Err(NodeError::Config(
                "max_in_flight_dials must be at least 1".to_string(),
            ));
        }
        if self.mempool_capacity == 0 {
            return Err(NodeError::Config(
                "mempool_capacity must be at least 1".to_string(),
            ));
        }
        if let Some(bootstrap) = &self.bootstrap {
            split_address(bootstrap)?;
        }
        Ok(())
    }
}

/// Client-side configuration: what record version to emit and where to send it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub deployment_record_version: u32,
    pub service_address: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            deployment_record_version: 1,
            service_address: "127.0.0.1:5000".to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads from `PLOCK_DEPLOYMENT_RECORD_VERSION` and `PLOCK_SERVICE_ADDRESS`,
    /// falling back to defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Config` if a set variable is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_RECORD_VERSION) {
            config.deployment_record_version = raw.trim().parse().map_err(|_| {
                NodeError::Config(format!("{} must be an integer, got '{}'", ENV_RECORD_VERSION, raw))
            })?;
        }

        if let Some(raw) = lookup(ENV_SERVICE_ADDRESS) {
            let address = raw.trim().to_string();
            split_address(&address)?;
            config.service_address = address;
        }

        Ok(config)
    }
}

/// Splits `host:port`, validating the port.
///
/// # Errors
///
/// Returns `NodeError::Config` if there is no `:` or the port is not a u16.
pub fn split_address(address: &str) -> Result<(&str, u16)> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| NodeError::Config(format!("address '{}' is not host:port", address)))?;

    if host.is_empty() {
        return Err(NodeError::Config(format!("address '{}' has no host", address)));
    }

    let port = port
        .parse()
        .map_err(|_| NodeError::Config(format!("address '{}' has an invalid port", address)))?;

    Ok((host, port))
}
