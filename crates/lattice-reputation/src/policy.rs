// crates/lattice-reputation/src/policy.rs
//
// Termination policies for the EigenTrust iteration loop.
//
// The calculator writes the last iteration of an epoch to a different sink,
// so "is this the last iteration?" has to be answered before the iteration
// runs. Policies decide it from the snapshot just produced and the one it
// replaced.

use lattice_core::{LatticeError, TrustValue};

use crate::snapshot::GlobalTrust;

/// Decides whether the next iteration of an epoch is the last one.
pub trait TerminationPolicy: Send + Sync {
    /// `next` is the index of the iteration about to run. `latest` is the
    /// snapshot of iteration `next - 1` and `superseded` that of `next - 2`,
    /// when they exist.
    fn is_last(
        &self,
        next: u32,
        latest: Option<&GlobalTrust>,
        superseded: Option<&GlobalTrust>,
    ) -> bool;
}

/// Run exactly `count` iterations per epoch.
#[derive(Debug, Clone, Copy)]
pub struct FixedIterations {
    count: u32,
}

impl FixedIterations {
    pub fn new(count: u32) -> Result<Self, LatticeError> {
        if count == 0 {
            return Err(LatticeError::Config(
                "iteration count must be at least 1".to_string(),
            ));
        }
        Ok(Self { count })
    }
}

impl TerminationPolicy for FixedIterations {
    fn is_last(
        &self,
        next: u32,
        _latest: Option<&GlobalTrust>,
        _superseded: Option<&GlobalTrust>,
    ) -> bool {
        next + 1 >= self.count
    }
}

/// Stop once consecutive snapshots agree within `tolerance` for every peer.
///
/// After two snapshots differ by at most `tolerance`, one more iteration is
/// run and written as the final result. `max_iterations` bounds the epoch
/// when trust keeps moving.
#[derive(Debug, Clone, Copy)]
pub struct Stabilization {
    tolerance: TrustValue,
    max_iterations: u32,
}

impl Stabilization {
    pub fn new(tolerance: TrustValue, max_iterations: u32) -> Result<Self, LatticeError> {
        if max_iterations == 0 {
            return Err(LatticeError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            tolerance,
            max_iterations,
        })
    }
}

impl TerminationPolicy for Stabilization {
    fn is_last(
        &self,
        next: u32,
        latest: Option<&GlobalTrust>,
        superseded: Option<&GlobalTrust>,
    ) -> bool {
        if next + 1 >= self.max_iterations {
            return true;
        }
        match (latest, superseded) {
            (Some(latest), Some(superseded)) => latest.distance(superseded) <= self.tolerance,
            _ => false,
        }
    }
}
