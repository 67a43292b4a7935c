// crates/lattice-core/src/lib.rs
//
// lattice-core: Core types, traits, and fixed-point trust arithmetic for the
// Lattice storage network.
//
// This is the leaf crate of the workspace. It defines peer identifiers,
// the deterministic TrustValue type, epoch/iteration bookkeeping, network
// map snapshots, and the error type shared by the reputation subsystem.

pub mod epoch;
pub mod error;
pub mod netmap;
pub mod peer;
pub mod traits;
pub mod trust;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use lattice_core::TrustValue;`

pub use epoch::{EpochIteration, IterationContext};
pub use error::LatticeError;
pub use netmap::{NetMap, NodeInfo, StaticNetmap};
pub use peer::PeerId;
pub use traits::NetmapSource;
pub use trust::{LocalTrust, TrustValue, TRUST_ONE, TRUST_SCALE, TRUST_ZERO};
