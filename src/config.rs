//! Node configuration, loaded from TOML with every field defaulted.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};
use crate::model::ValidationMode;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub listen: SocketAddr,
    /// Peers registered at startup.
    pub peers: Vec<String>,
    pub peer_timeout_ms: u64,
    /// Period of background consensus passes; none means request-triggered only.
    pub consensus_interval_secs: Option<u64>,
    pub validation: ValidationMode,
}

impl NodeConfig {
    pub fn load(path: &Path) -> NodeResult<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|err| NodeError::Config(format!("unable to parse config: {err}")))
    }

    pub fn save(&self, path: &Path) -> NodeResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let encoded = toml::to_string_pretty(self)
            .map_err(|err| NodeError::Config(format!("unable to encode config: {err}")))?;
        fs::write(path, encoded)?;
        Ok(())
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    pub fn consensus_interval(&self) -> Option<Duration> {
        self.consensus_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 5000)),
            peers: Vec::new(),
            peer_timeout_ms: 5_000,
            consensus_interval_secs: None,
            validation: ValidationMode::Linkage,
        }
    }
}
