// crates/lattice-reputation/src/controller.rs
//
// Epoch driver for the EigenTrust calculation.
//
// Iteration i+1 needs the complete snapshot of iteration i, so iterations
// run strictly one after another. Only the most recent snapshot is kept.
// Lifecycle per epoch: Idle -> Running(0..K) -> Done, or Aborted / Failed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use lattice_core::{EpochIteration, IterationContext, LatticeError};

use crate::policy::TerminationPolicy;
use crate::snapshot::GlobalTrust;

/// Computes one iteration from its context and the previous snapshot.
///
/// Implemented by `Calculator`; the controller only depends on this seam.
#[async_trait]
pub trait DaughtersTrustCalculator: Send + Sync {
    async fn calculate(
        &self,
        ctx: &IterationContext,
        previous: Option<Arc<GlobalTrust>>,
    ) -> Result<Arc<GlobalTrust>, LatticeError>;
}

/// Where the controller is in its current (or most recent) epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochState {
    Idle,
    Running { epoch: u64, iteration: u32 },
    Done { epoch: u64 },
    Aborted { epoch: u64 },
    Failed { epoch: u64 },
}

/// Summary of a finished epoch run.
#[derive(Debug, Clone)]
pub struct EpochReport {
    pub epoch: u64,
    /// Number of iterations that completed.
    pub iterations: u32,
    /// The run was stopped by `abort` before its last iteration.
    pub aborted: bool,
    /// Snapshot of the last iteration, when the epoch completed.
    pub result: Option<Arc<GlobalTrust>>,
}

/// Stop request for one epoch run.
///
/// Clones share the flag. The caller creates it before any preparation
/// work, so a stop requested early is still seen by the run.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Progress {
    state: EpochState,
    last_epoch: Option<u64>,
    /// Signal of the run in progress.
    signal: Option<AbortSignal>,
}

/// Runs EigenTrust epochs iteration by iteration.
pub struct Controller {
    calculator: Arc<dyn DaughtersTrustCalculator>,
    policy: Arc<dyn TerminationPolicy>,
    progress: RwLock<Progress>,
}

impl Controller {
    pub fn new(
        calculator: Arc<dyn DaughtersTrustCalculator>,
        policy: Arc<dyn TerminationPolicy>,
    ) -> Self {
        Self {
            calculator,
            policy,
            progress: RwLock::new(Progress {
                state: EpochState::Idle,
                last_epoch: None,
                signal: None,
            }),
        }
    }

    pub async fn state(&self) -> EpochState {
        self.progress.read().await.state
    }

    /// The most recent epoch passed to `run_epoch`.
    pub async fn last_epoch(&self) -> Option<u64> {
        self.progress.read().await.last_epoch
    }

    /// Stop the running epoch at the next iteration boundary.
    ///
    /// The iteration in progress finishes. Has no effect when idle.
    pub async fn abort(&self) {
        if let Some(signal) = &self.progress.read().await.signal {
            signal.abort();
        }
    }

    /// Run every iteration of `epoch` until the termination policy marks one last.
    ///
    /// Epochs must not go backwards; re-running the latest epoch is allowed
    /// so callers can retry after a failure.
    pub async fn run_epoch(&self, epoch: u64) -> Result<EpochReport, LatticeError> {
        self.run_epoch_with(epoch, AbortSignal::new()).await
    }

    /// Like `run_epoch`, stopping at the first iteration boundary after
    /// `signal` is aborted, including before iteration 0.
    pub async fn run_epoch_with(
        &self,
        epoch: u64,
        signal: AbortSignal,
    ) -> Result<EpochReport, LatticeError> {
        {
            let mut progress = self.progress.write().await;
            if matches!(progress.state, EpochState::Running { .. }) {
                return Err(LatticeError::AlreadyRunning);
            }
            if let Some(last) = progress.last_epoch {
                if epoch < last {
                    return Err(LatticeError::StaleEpoch {
                        last,
                        requested: epoch,
                    });
                }
            }
            progress.last_epoch = Some(epoch);
            progress.state = EpochState::Running { epoch, iteration: 0 };
            progress.signal = Some(signal.clone());
        }

        tracing::info!("Epoch {}: starting EigenTrust iterations", epoch);

        let mut previous: Option<Arc<GlobalTrust>> = None;
        let mut last = self.policy.is_last(0, None, None);
        let mut i: u32 = 0;

        loop {
            if signal.is_aborted() {
                tracing::warn!("Epoch {}: aborted after {} iterations", epoch, i);
                self.finish(EpochState::Aborted { epoch }).await;
                return Ok(EpochReport {
                    epoch,
                    iterations: i,
                    aborted: true,
                    result: None,
                });
            }

            self.set_state(EpochState::Running { epoch, iteration: i }).await;
            let ctx = IterationContext::new(EpochIteration::new(epoch, i), last);

            let snapshot = match self.calculator.calculate(&ctx, previous.clone()).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!("Epoch {}: iteration {} failed: {}", epoch, i, e);
                    self.finish(EpochState::Failed { epoch }).await;
                    return Err(e);
                }
            };

            if last {
                tracing::info!(
                    "Epoch {}: final trust computed for {} peers after {} iterations",
                    epoch,
                    snapshot.len(),
                    i + 1
                );
                self.finish(EpochState::Done { epoch }).await;
                return Ok(EpochReport {
                    epoch,
                    iterations: i + 1,
                    aborted: false,
                    result: Some(snapshot),
                });
            }

            last = self
                .policy
                .is_last(i + 1, Some(snapshot.as_ref()), previous.as_deref());
            previous = Some(snapshot);
            i += 1;
        }
    }

    async fn set_state(&self, state: EpochState) {
        self.progress.write().await.state = state;
    }

    async fn finish(&self, state: EpochState) {
        let mut progress = self.progress.write().await;
        progress.state = state;
        progress.signal = None;
    }
}
