// crates/lattice-reputation/src/config.rs
//
// EigenTrust tuning parameters. Deserialized from the `[eigentrust]` table
// of the daemon configuration, or populated with defaults.

use std::sync::Arc;

use serde::Deserialize;

use lattice_core::{LatticeError, TrustValue};

use crate::policy::{FixedIterations, Stabilization, TerminationPolicy};

/// Parameters of the EigenTrust computation.
#[derive(Debug, Clone, Deserialize)]
pub struct EigenTrustConfig {
    /// Weight of propagated trust versus initial trust. Must be in (0, 1).
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Iteration budget per epoch.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// When set, an epoch ends early once two consecutive snapshots differ
    /// by at most this much for every peer.
    #[serde(default)]
    pub stabilization_tolerance: Option<f64>,

    /// Number of per-peer computations allowed to run at once.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// How many epochs back the network map used for initial trust lies.
    #[serde(default = "default_netmap_diff")]
    pub netmap_diff: u64,
}

fn default_alpha() -> f64 {
    0.1
}

fn default_iterations() -> u32 {
    4
}

fn default_worker_pool_size() -> usize {
    8
}

fn default_netmap_diff() -> u64 {
    1
}

impl Default for EigenTrustConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            iterations: default_iterations(),
            stabilization_tolerance: None,
            worker_pool_size: default_worker_pool_size(),
            netmap_diff: default_netmap_diff(),
        }
    }
}

impl EigenTrustConfig {
    /// Check every parameter, returning the first violation.
    pub fn validate(&self) -> Result<(), LatticeError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(LatticeError::Config(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if self.iterations == 0 {
            return Err(LatticeError::Config(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.worker_pool_size == 0 {
            return Err(LatticeError::Config(
                "worker_pool_size must be at least 1".to_string(),
            ));
        }
        if let Some(tolerance) = self.stabilization_tolerance {
            if !(0.0..=1.0).contains(&tolerance) {
                return Err(LatticeError::Config(format!(
                    "stabilization_tolerance must be in [0, 1], got {}",
                    tolerance
                )));
            }
        }
        Ok(())
    }

    /// Build the termination policy these parameters describe.
    pub fn termination_policy(&self) -> Result<Arc<dyn TerminationPolicy>, LatticeError> {
        self.validate()?;
        match self.stabilization_tolerance {
            Some(tolerance) => Ok(Arc::new(Stabilization::new(
                TrustValue::from_f64(tolerance),
                self.iterations,
            )?)),
            None => Ok(Arc::new(FixedIterations::new(self.iterations)?)),
        }
    }
}
