// crates/lattice-core/src/epoch.rs
//
// Epoch and iteration bookkeeping for EigenTrust rounds.
//
// An epoch is the period over which nodes collect local trust reports.
// At its end every node runs a fixed sequence of iterations 0, 1, 2, ...
// whose last one produces the epoch's final global trust.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one computation round: an epoch and an iteration within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpochIteration {
    epoch: u64,
    i: u32,
}

impl EpochIteration {
    pub fn new(epoch: u64, i: u32) -> Self {
        Self { epoch, i }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Iteration index within the epoch, starting at 0.
    pub fn i(&self) -> u32 {
        self.i
    }

    /// The iteration that follows this one in the same epoch.
    pub fn next(&self) -> Self {
        Self {
            epoch: self.epoch,
            i: self.i + 1,
        }
    }

    /// The iteration this one depends on, if any.
    pub fn previous(&self) -> Option<Self> {
        self.i.checked_sub(1).map(|i| Self {
            epoch: self.epoch,
            i,
        })
    }
}

impl fmt::Display for EpochIteration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch {} iteration {}", self.epoch, self.i)
    }
}

/// The parameters of one iteration as decided by the controller.
///
/// `last` is the only termination signal the calculator ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationContext {
    epoch_iteration: EpochIteration,
    last: bool,
}

impl IterationContext {
    pub fn new(epoch_iteration: EpochIteration, last: bool) -> Self {
        Self {
            epoch_iteration,
            last,
        }
    }

    pub fn epoch_iteration(&self) -> EpochIteration {
        self.epoch_iteration
    }

    pub fn epoch(&self) -> u64 {
        self.epoch_iteration.epoch()
    }

    pub fn i(&self) -> u32 {
        self.epoch_iteration.i()
    }

    pub fn last(&self) -> bool {
        self.last
    }
}
