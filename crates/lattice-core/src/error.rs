// crates/lattice-core/src/error.rs

use thiserror::Error;

/// Workspace-wide error type for the Lattice reputation subsystem.
#[derive(Debug, Error)]
pub enum LatticeError {
    /// Invalid construction parameter (alpha out of range, missing dependency).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The network map has no nodes, so initial trust cannot be derived.
    #[error("Network map is empty")]
    EmptyNetworkMap,

    /// The network map could not be fetched.
    #[error("Network map error: {0}")]
    NetMap(String),

    /// A trust report source failed.
    #[error("Data source error: {0}")]
    DataSource(String),

    /// An iteration > 0 was requested without the snapshot it depends on.
    #[error("Missing global trust snapshot of epoch {epoch} iteration {iteration}")]
    MissingSnapshot { epoch: u64, iteration: u32 },

    /// Arithmetic or value-range error.
    #[error("Computation error: {0}")]
    Computation(String),

    /// A sink rejected a write, or could not be opened or flushed.
    #[error("Sink error: {0}")]
    Sink(String),

    /// The worker pool no longer accepts tasks.
    #[error("Worker pool is closed")]
    PoolClosed,

    /// Epochs must be run in non-decreasing order.
    #[error("Stale epoch {requested}: epoch {last} has already run")]
    StaleEpoch { last: u64, requested: u64 },

    /// Another epoch is still being computed.
    #[error("An epoch is already running")]
    AlreadyRunning,
}

impl LatticeError {
    /// Whether this error affects every peer of an iteration rather than a
    /// single one.
    ///
    /// The network map is shared by all peers, so failing to obtain it means
    /// no peer of the iteration can bootstrap.
    pub fn is_network_wide(&self) -> bool {
        matches!(
            self,
            LatticeError::EmptyNetworkMap | LatticeError::NetMap(_) | LatticeError::PoolClosed
        )
    }
}
