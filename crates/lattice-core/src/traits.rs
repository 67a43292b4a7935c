// crates/lattice-core/src/traits.rs

use async_trait::async_trait;

use crate::error::LatticeError;
use crate::netmap::NetMap;

/// Source of network map snapshots.
///
/// Implemented by the chain client layer; `StaticNetmap` serves fixed maps.
#[async_trait]
pub trait NetmapSource: Send + Sync {
    /// Return the network map `diff` epochs before the current one.
    async fn get_net_map(&self, diff: u64) -> Result<NetMap, LatticeError>;
}
