// crates/lattice-core/src/netmap.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LatticeError;
use crate::peer::PeerId;
use crate::traits::NetmapSource;

/// Snapshot of the nodes eligible for trust computation in an epoch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetMap {
    /// Epoch this snapshot belongs to.
    pub epoch: u64,
    /// All nodes present in the map.
    pub nodes: Vec<NodeInfo>,
}

impl NetMap {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Identifiers of every node in the map.
    pub fn peers(&self) -> Vec<PeerId> {
        self.nodes.iter().map(NodeInfo::peer_id).collect()
    }
}

/// A single network map entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node public key.
    pub public_key: Vec<u8>,
    /// Announced network address (multiaddr).
    pub address: String,
}

impl NodeInfo {
    pub fn peer_id(&self) -> PeerId {
        PeerId::from_public_key(&self.public_key)
    }
}

/// A network map source that always returns the same node list.
///
/// Used by nodes with a statically configured network and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticNetmap {
    netmap: NetMap,
}

impl StaticNetmap {
    pub fn new(netmap: NetMap) -> Self {
        Self { netmap }
    }
}

#[async_trait]
impl NetmapSource for StaticNetmap {
    async fn get_net_map(&self, _diff: u64) -> Result<NetMap, LatticeError> {
        Ok(self.netmap.clone())
    }
}
