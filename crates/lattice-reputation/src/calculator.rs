// crates/lattice-reputation/src/calculator.rs
//
// One iteration of the EigenTrust algorithm.
//
// For every daughter P this node is responsible for:
//
//   t(P) = alpha * sum_R( c(R, P) * t_prev(R) ) + beta * p(P),  beta = 1 - alpha
//
// where c(R, P) is R's normalized local trust in P, t_prev(R) is R's global
// trust from the previous iteration (initial trust at iteration 0), and p(P)
// is P's initial trust. The previous snapshot is received rather than
// recomputed, so each node only computes the peers it is responsible for.
//
// Per-peer computations fan out on the shared worker pool and are awaited
// together before the call returns.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use lattice_core::{
    EpochIteration, IterationContext, LatticeError, PeerId, TrustValue, TRUST_ONE, TRUST_ZERO,
};

use crate::controller::DaughtersTrustCalculator;
use crate::daughters::DaughterTrustIteratorProvider;
use crate::initial::InitialTrustSource;
use crate::pool::WorkerPool;
use crate::sinks::{FinalResultTarget, FinalWriter, IntermediateWriter, IntermediateWriterProvider};
use crate::snapshot::GlobalTrust;

/// Construction parameters of a [`Calculator`].
///
/// Every dependency is required; `Calculator::new` rejects a missing one.
#[derive(Default)]
pub struct CalculatorPrm {
    /// Damping factor from the EigenTrust paper (Ch. 5.1). Must be in (0, 1).
    pub alpha: f64,
    pub initial_trust_source: Option<Arc<dyn InitialTrustSource>>,
    pub daughter_trust_source: Option<Arc<dyn DaughterTrustIteratorProvider>>,
    pub intermediate_value_target: Option<Arc<dyn IntermediateWriterProvider>>,
    pub final_result_target: Option<Arc<dyn FinalResultTarget>>,
    pub worker_pool: Option<Arc<WorkerPool>>,
}

/// Parameters of a single `calculate` call.
#[derive(Debug, Clone)]
pub struct CalculatePrm {
    pub epoch_iteration: EpochIteration,
    /// Route results to the final target instead of the intermediate one.
    pub last: bool,
    /// Snapshot of iteration `i - 1`. Required when `i > 0`.
    pub previous: Option<Arc<GlobalTrust>>,
}

/// Processor of a single EigenTrust iteration.
///
/// Validated at construction; a constructed calculator needs no further
/// setup and can be shared across iterations and epochs.
pub struct Calculator {
    alpha: TrustValue,
    beta: TrustValue,
    initial: Arc<dyn InitialTrustSource>,
    daughters: Arc<dyn DaughterTrustIteratorProvider>,
    intermediate: Arc<dyn IntermediateWriterProvider>,
    final_target: Arc<dyn FinalResultTarget>,
    pool: Arc<WorkerPool>,
}

fn missing(name: &str) -> LatticeError {
    LatticeError::Config(format!("invalid parameter {}: missing", name))
}

impl Calculator {
    pub fn new(prm: CalculatorPrm) -> Result<Self, LatticeError> {
        if !(prm.alpha > 0.0 && prm.alpha < 1.0) {
            return Err(LatticeError::Config(format!(
                "invalid parameter alpha: {} is not in (0, 1)",
                prm.alpha
            )));
        }
        let alpha = TrustValue::from_f64(prm.alpha);
        if alpha == TRUST_ZERO || alpha == TRUST_ONE {
            return Err(LatticeError::Config(format!(
                "invalid parameter alpha: {} rounds to a bound of (0, 1)",
                prm.alpha
            )));
        }

        Ok(Self {
            alpha,
            beta: TRUST_ONE - alpha,
            initial: prm
                .initial_trust_source
                .ok_or_else(|| missing("initial_trust_source"))?,
            daughters: prm
                .daughter_trust_source
                .ok_or_else(|| missing("daughter_trust_source"))?,
            intermediate: prm
                .intermediate_value_target
                .ok_or_else(|| missing("intermediate_value_target"))?,
            final_target: prm
                .final_result_target
                .ok_or_else(|| missing("final_result_target"))?,
            pool: prm.worker_pool.ok_or_else(|| missing("worker_pool"))?,
        })
    }

    pub fn alpha(&self) -> TrustValue {
        self.alpha
    }

    pub fn beta(&self) -> TrustValue {
        self.beta
    }

    /// Run one iteration for every daughter and return the resulting snapshot.
    ///
    /// Returns only after every per-peer task has finished. Peers whose
    /// computation or write failed are logged and left out of the snapshot.
    /// When the iteration fails as a whole the writer is discarded, so the
    /// sink never holds a partial result.
    pub async fn calculate(&self, prm: CalculatePrm) -> Result<Arc<GlobalTrust>, LatticeError> {
        let ei = prm.epoch_iteration;
        let previous = previous_snapshot(&prm)?;

        let daughters = self.daughters.daughters(ei).await?;
        let route = if prm.last {
            Route::Final(self.final_target.init_writer(ei.epoch()).await?)
        } else {
            Route::Intermediate(self.intermediate.init_writer(ei).await?)
        };

        tracing::info!(
            "Epoch {} iteration {}: computing trust of {} peers (last={})",
            ei.epoch(),
            ei.i(),
            daughters.len(),
            prm.last
        );

        let stop = Arc::new(AtomicBool::new(false));
        let mut batch = self.pool.batch();
        let mut dispatched = Vec::with_capacity(daughters.len());
        let mut fatal = None;

        for daughter in daughters {
            let job = PeerJob {
                peer: daughter,
                epoch_iteration: ei,
                alpha: self.alpha,
                beta: self.beta,
                previous: previous.clone(),
                initial: self.initial.clone(),
                daughters: self.daughters.clone(),
                route: route.clone(),
                stop: stop.clone(),
            };
            if let Err(e) = batch.submit(job.run()).await {
                stop.store(true, Ordering::SeqCst);
                fatal = Some(e);
                break;
            }
            dispatched.push(daughter);
        }

        let report = batch.wait().await;

        let mut values = BTreeMap::new();
        let mut accounted = BTreeSet::new();
        for outcome in report.outputs {
            match outcome {
                PeerOutcome::Done(peer, value) => {
                    accounted.insert(peer);
                    values.insert(peer, value);
                }
                PeerOutcome::Failed(peer, err) => {
                    accounted.insert(peer);
                    if err.is_network_wide() {
                        fatal.get_or_insert(err);
                    }
                }
                PeerOutcome::Skipped(peer) => {
                    accounted.insert(peer);
                    tracing::debug!("{}: peer {} skipped after abort", ei, peer);
                }
            }
        }
        if report.panicked > 0 {
            for peer in dispatched.iter().filter(|p| !accounted.contains(*p)) {
                tracing::warn!("{}: excluding peer {}: computation panicked", ei, peer);
            }
        }

        if let Some(err) = fatal {
            tracing::error!(
                "Epoch {} iteration {}: iteration aborted: {}",
                ei.epoch(),
                ei.i(),
                err
            );
            route.discard(ei).await;
            return Err(err);
        }

        if let Err(e) = route.close().await {
            tracing::error!("{}: closing writer failed: {}", ei, e);
            route.discard(ei).await;
            return Err(e);
        }

        tracing::info!(
            "Epoch {} iteration {}: {} peer values written",
            ei.epoch(),
            ei.i(),
            values.len()
        );
        Ok(Arc::new(GlobalTrust::new(ei, values)))
    }
}

#[async_trait]
impl DaughtersTrustCalculator for Calculator {
    async fn calculate(
        &self,
        ctx: &IterationContext,
        previous: Option<Arc<GlobalTrust>>,
    ) -> Result<Arc<GlobalTrust>, LatticeError> {
        let prm = CalculatePrm {
            epoch_iteration: ctx.epoch_iteration(),
            last: ctx.last(),
            previous,
        };
        Calculator::calculate(self, prm).await
    }
}

/// Check that the supplied snapshot is the one iteration `i` depends on.
fn previous_snapshot(prm: &CalculatePrm) -> Result<Option<Arc<GlobalTrust>>, LatticeError> {
    let Some(expected) = prm.epoch_iteration.previous() else {
        return Ok(None);
    };
    match &prm.previous {
        Some(snapshot) if snapshot.epoch_iteration() == expected => Ok(Some(snapshot.clone())),
        _ => Err(LatticeError::MissingSnapshot {
            epoch: expected.epoch(),
            iteration: expected.i(),
        }),
    }
}

/// Where an iteration's values go; fixed before any task is dispatched.
#[derive(Clone)]
enum Route {
    Intermediate(Arc<dyn IntermediateWriter>),
    Final(Arc<dyn FinalWriter>),
}

impl Route {
    async fn write(
        &self,
        peer: &PeerId,
        ei: EpochIteration,
        value: TrustValue,
    ) -> Result<(), LatticeError> {
        match self {
            Route::Intermediate(w) => w.write(peer, ei, value).await,
            Route::Final(w) => w.write(peer, ei.epoch(), value).await,
        }
    }

    async fn close(&self) -> Result<(), LatticeError> {
        match self {
            Route::Intermediate(w) => w.close().await,
            Route::Final(w) => w.close().await,
        }
    }

    /// Drop the partial output of a failed iteration.
    async fn discard(&self, ei: EpochIteration) {
        let result = match self {
            Route::Intermediate(w) => w.discard().await,
            Route::Final(w) => w.discard().await,
        };
        if let Err(e) = result {
            tracing::warn!("{}: discarding partial output failed: {}", ei, e);
        }
    }
}

enum PeerOutcome {
    Done(PeerId, TrustValue),
    Failed(PeerId, LatticeError),
    /// Not computed because the iteration was already aborting.
    Skipped(PeerId),
}

struct PeerJob {
    peer: PeerId,
    epoch_iteration: EpochIteration,
    alpha: TrustValue,
    beta: TrustValue,
    previous: Option<Arc<GlobalTrust>>,
    initial: Arc<dyn InitialTrustSource>,
    daughters: Arc<dyn DaughterTrustIteratorProvider>,
    route: Route,
    stop: Arc<AtomicBool>,
}

impl PeerJob {
    async fn run(self) -> PeerOutcome {
        if self.stop.load(Ordering::SeqCst) {
            return PeerOutcome::Skipped(self.peer);
        }

        let ei = self.epoch_iteration;
        let result = match self.compute().await {
            Ok(value) => self.route.write(&self.peer, ei, value).await.map(|_| value),
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => {
                tracing::debug!("{}: peer {} trust {}", ei, self.peer, value);
                PeerOutcome::Done(self.peer, value)
            }
            Err(e) => {
                if e.is_network_wide() {
                    self.stop.store(true, Ordering::SeqCst);
                }
                tracing::warn!("{}: excluding peer {}: {}", ei, self.peer, e);
                PeerOutcome::Failed(self.peer, e)
            }
        }
    }

    async fn compute(&self) -> Result<TrustValue, LatticeError> {
        let ei = self.epoch_iteration;
        let trusts = self.daughters.daughter_trusts(ei, &self.peer).await?;

        let mut propagated = TRUST_ZERO;
        for trust in &trusts {
            let reporter_trust = match &self.previous {
                Some(snapshot) => snapshot.get(trust.truster()).unwrap_or(TRUST_ZERO),
                None => self.initial.initial_trust(trust.truster()).await?,
            };
            propagated = propagated + trust.value() * reporter_trust;
        }

        let initial = self.initial.initial_trust(&self.peer).await?;
        Ok(self.alpha * propagated + self.beta * initial)
    }
}
