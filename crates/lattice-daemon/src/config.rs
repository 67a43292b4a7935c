// crates/lattice-daemon/src/config.rs
//
// Runtime configuration for the Lattice daemon.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

use lattice_core::{LatticeError, NetMap, NodeInfo, PeerId};
use lattice_reputation::EigenTrustConfig;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between epoch ticks.
    #[serde(default = "default_epoch_interval_secs")]
    pub epoch_interval_secs: u64,

    /// Static network map: every node eligible for trust computation.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    /// Local trust observations fed into every epoch.
    #[serde(default)]
    pub seed_reports: Vec<SeedReport>,

    /// EigenTrust parameters.
    #[serde(default)]
    pub eigentrust: EigenTrustConfig,
}

/// A network map entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Hex-encoded public key.
    pub public_key: String,
    /// Announced network address.
    #[serde(default)]
    pub address: String,
}

/// A local trust observation between two nodes, identified by public key.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedReport {
    pub truster: String,
    pub trustee: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_epoch_interval_secs() -> u64 {
    60
}

fn default_weight() -> f64 {
    1.0
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            epoch_interval_secs: default_epoch_interval_secs(),
            nodes: Vec::new(),
            seed_reports: Vec::new(),
            eigentrust: EigenTrustConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Check the configuration before anything is started.
    pub fn validate(&self) -> Result<(), LatticeError> {
        if self.epoch_interval_secs == 0 {
            return Err(LatticeError::Config(
                "epoch_interval_secs must be at least 1".to_string(),
            ));
        }
        self.eigentrust.validate()
    }

    /// Build the static network map from the configured nodes.
    pub fn netmap(&self) -> Result<NetMap, LatticeError> {
        let nodes = self
            .nodes
            .iter()
            .map(|n| {
                Ok(NodeInfo {
                    public_key: decode_key(&n.public_key)?,
                    address: n.address.clone(),
                })
            })
            .collect::<Result<Vec<_>, LatticeError>>()?;
        Ok(NetMap { epoch: 0, nodes })
    }

    /// Resolve seed reports to (truster, trustee, weight) triples.
    pub fn seeds(&self) -> Result<Vec<(PeerId, PeerId, f64)>, LatticeError> {
        self.seed_reports
            .iter()
            .map(|r| {
                Ok((
                    PeerId::from_public_key(&decode_key(&r.truster)?),
                    PeerId::from_public_key(&decode_key(&r.trustee)?),
                    r.weight,
                ))
            })
            .collect()
    }
}

fn decode_key(s: &str) -> Result<Vec<u8>, LatticeError> {
    hex::decode(s).map_err(|e| LatticeError::Config(format!("invalid public key {:?}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let config: DaemonConfig = toml::from_str(
            r#"
            log_level = "debug"
            epoch_interval_secs = 5

            [[nodes]]
            public_key = "aa01"
            address = "/ip4/10.0.0.1/tcp/8080"

            [[nodes]]
            public_key = "bb02"

            [[seed_reports]]
            truster = "aa01"
            trustee = "bb02"
            weight = 3.0

            [eigentrust]
            alpha = 0.2
            iterations = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.epoch_interval_secs, 5);
        assert_eq!(config.eigentrust.alpha, 0.2);
        assert_eq!(config.eigentrust.worker_pool_size, 8);
        assert!(config.validate().is_ok());

        let nm = config.netmap().unwrap();
        assert_eq!(nm.len(), 2);
        assert_eq!(nm.nodes[0].public_key, vec![0xaa, 0x01]);

        let seeds = config.seeds().unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].0, PeerId::from_public_key(&[0xaa, 0x01]));
        assert_eq!(seeds[0].2, 3.0);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config.epoch_interval_secs, 60);
        assert!(config.nodes.is_empty());
        assert_eq!(config.eigentrust.iterations, 4);
    }

    #[test]
    fn bad_key_is_a_config_error() {
        let config = DaemonConfig {
            nodes: vec![NodeConfig {
                public_key: "zz".to_string(),
                address: String::new(),
            }],
            ..DaemonConfig::default()
        };
        assert!(matches!(config.netmap(), Err(LatticeError::Config(_))));
    }

    #[test]
    fn invalid_alpha_fails_validation() {
        let mut config = DaemonConfig::default();
        config.eigentrust.alpha = 1.0;
        assert!(config.validate().is_err());
    }
}
