// crates/lattice-reputation/src/initial.rs
//
// Bootstrap trust for EigenTrust iteration 0 and for the damping term.
//
// With no prior history every peer starts from the same share of the
// network: TrustOne / N, where N is the number of nodes in the network map.

use std::sync::Arc;

use async_trait::async_trait;

use lattice_core::{LatticeError, NetmapSource, PeerId, TrustValue, TRUST_ONE};

/// Source of the initial (pre-trust) value of a peer.
#[async_trait]
pub trait InitialTrustSource: Send + Sync {
    async fn initial_trust(&self, peer: &PeerId) -> Result<TrustValue, LatticeError>;
}

/// Derives initial trust from the size of the network map.
///
/// The value does not depend on the peer argument.
pub struct NetmapInitialTrust {
    netmap: Arc<dyn NetmapSource>,
    /// Which network map to size the network from (epochs back from current).
    diff: u64,
}

impl NetmapInitialTrust {
    pub fn new(netmap: Arc<dyn NetmapSource>, diff: u64) -> Self {
        Self { netmap, diff }
    }
}

#[async_trait]
impl InitialTrustSource for NetmapInitialTrust {
    async fn initial_trust(&self, _peer: &PeerId) -> Result<TrustValue, LatticeError> {
        let nm = self
            .netmap
            .get_net_map(self.diff)
            .await
            .map_err(|e| match e {
                LatticeError::NetMap(_) => e,
                other => LatticeError::NetMap(format!("failed to get network map: {}", other)),
            })?;

        let node_count = nm.len() as u64;
        if node_count == 0 {
            return Err(LatticeError::EmptyNetworkMap);
        }

        Ok(TRUST_ONE.div_count(node_count))
    }
}

/// Returns the same pinned value for every peer.
#[derive(Debug, Clone, Copy)]
pub struct FixedInitialTrust(pub TrustValue);

#[async_trait]
impl InitialTrustSource for FixedInitialTrust {
    async fn initial_trust(&self, _peer: &PeerId) -> Result<TrustValue, LatticeError> {
        Ok(self.0)
    }
}
