// crates/lattice-daemon/src/scheduler.rs
//
// Epoch scheduler for the Lattice daemon.
//
// Advances the epoch counter on a fixed interval, feeds the epoch's local
// trust reports into the collector and runs the EigenTrust controller.

use std::sync::Arc;
use std::time::Duration;

use lattice_core::{LatticeError, PeerId};
use lattice_reputation::{
    AbortSignal, Controller, EpochReport, LocalTrustCollector, MemoryFinalTarget,
};

/// Drives one EigenTrust epoch per tick.
pub struct EpochScheduler {
    interval: Duration,
    current_epoch: u64,
    controller: Arc<Controller>,
    collector: Arc<LocalTrustCollector>,
    final_target: MemoryFinalTarget,
    seeds: Vec<(PeerId, PeerId, f64)>,
}

impl EpochScheduler {
    pub fn new(
        interval: Duration,
        controller: Arc<Controller>,
        collector: Arc<LocalTrustCollector>,
        final_target: MemoryFinalTarget,
        seeds: Vec<(PeerId, PeerId, f64)>,
    ) -> Self {
        Self {
            interval,
            current_epoch: 0,
            controller,
            collector,
            final_target,
            seeds,
        }
    }

    pub fn current_epoch(&self) -> u64 {
        self.current_epoch
    }

    /// Run the scheduler loop until ctrl-c, or until `max_epochs` epochs ran.
    ///
    /// A shutdown signal during an epoch, including while its reports are
    /// still being seeded, aborts it at the next iteration boundary and
    /// waits for the calculator to drain.
    pub async fn run(
        &mut self,
        max_epochs: Option<u64>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!(
            "Epoch scheduler started (interval={}s)",
            self.interval.as_secs()
        );

        loop {
            if max_epochs.is_some_and(|max| self.current_epoch >= max) {
                tracing::info!("Epoch limit reached after epoch {}", self.current_epoch);
                break;
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Epoch scheduler received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            let signal = AbortSignal::new();
            let tick = self.advance_epoch_with(signal.clone());
            tokio::pin!(tick);
            tokio::select! {
                _ = &mut tick => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal during epoch; aborting calculation");
                    signal.abort();
                    tick.await;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Move to the next epoch and compute its global trust.
    ///
    /// Failures are logged; the next tick starts a fresh epoch.
    pub async fn advance_epoch(&mut self) -> Option<EpochReport> {
        self.advance_epoch_with(AbortSignal::new()).await
    }

    async fn advance_epoch_with(&mut self, signal: AbortSignal) -> Option<EpochReport> {
        self.current_epoch += 1;
        let epoch = self.current_epoch;
        tracing::info!("=== EPOCH {} ===", epoch);

        let result = self.run_epoch(epoch, signal).await;
        // Reports of a finished epoch are never read again, whatever the outcome.
        self.collector.retain_from(epoch + 1).await;

        match result {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!("Epoch {}: EigenTrust failed: {}", epoch, e);
                None
            }
        }
    }

    async fn run_epoch(
        &self,
        epoch: u64,
        signal: AbortSignal,
    ) -> Result<EpochReport, LatticeError> {
        for (truster, trustee, weight) in &self.seeds {
            self.collector.observe(epoch, *truster, *trustee, *weight).await;
        }

        let report = self.controller.run_epoch_with(epoch, signal).await?;

        if report.aborted {
            tracing::warn!(
                "Epoch {}: aborted after {} iterations",
                epoch,
                report.iterations
            );
            return Ok(report);
        }

        let published = self.final_target.epoch_result(epoch).await;
        for (peer, value) in &published {
            tracing::debug!("Epoch {}: {} -> {}", epoch, peer, value);
        }
        tracing::info!(
            "Epoch {}: published global trust for {} peers",
            epoch,
            published.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_core::{NetMap, NodeInfo, StaticNetmap, TrustValue};
    use lattice_reputation::{
        Calculator, CalculatorPrm, FixedIterations, MemoryIntermediateTarget, NetmapInitialTrust,
        WorkerPool,
    };

    fn scheduler(keys: &[&str], seeds: Vec<(PeerId, PeerId, f64)>) -> EpochScheduler {
        let netmap = Arc::new(StaticNetmap::new(NetMap {
            epoch: 0,
            nodes: keys
                .iter()
                .map(|k| NodeInfo {
                    public_key: k.as_bytes().to_vec(),
                    address: String::new(),
                })
                .collect(),
        }));
        let collector = Arc::new(LocalTrustCollector::new());
        let final_target = MemoryFinalTarget::new();
        let calculator = Calculator::new(CalculatorPrm {
            alpha: 0.5,
            initial_trust_source: Some(Arc::new(NetmapInitialTrust::new(netmap, 1))),
            daughter_trust_source: Some(collector.clone()),
            intermediate_value_target: Some(Arc::new(MemoryIntermediateTarget::new())),
            final_result_target: Some(Arc::new(final_target.clone())),
            worker_pool: Some(Arc::new(WorkerPool::new(2).unwrap())),
        })
        .unwrap();
        let controller = Arc::new(Controller::new(
            Arc::new(calculator),
            Arc::new(FixedIterations::new(2).unwrap()),
        ));
        EpochScheduler::new(
            Duration::from_millis(1),
            controller,
            collector,
            final_target,
            seeds,
        )
    }

    #[tokio::test]
    async fn each_tick_publishes_a_new_epoch() {
        let a = PeerId::from_public_key(b"a");
        let b = PeerId::from_public_key(b"b");
        let mut s = scheduler(&["a", "b"], vec![(a, b, 1.0), (b, a, 1.0)]);

        let first = s.advance_epoch().await.unwrap();
        let second = s.advance_epoch().await.unwrap();
        assert_eq!(first.epoch, 1);
        assert_eq!(second.epoch, 2);
        assert_eq!(s.current_epoch(), 2);

        let (epoch, values) = s.final_target.latest().await.unwrap();
        assert_eq!(epoch, 2);
        assert_eq!(values.get(&a), Some(&TrustValue::from_f64(0.5)));
        // Only the upcoming epoch's reports are retained.
        assert!(s.collector.epochs().await.is_empty());
    }

    #[tokio::test]
    async fn failed_epoch_does_not_stop_the_scheduler() {
        let a = PeerId::from_public_key(b"a");
        let b = PeerId::from_public_key(b"b");
        // Empty network map: initial trust is undefined.
        let mut s = scheduler(&[], vec![(a, b, 1.0)]);

        assert!(s.advance_epoch().await.is_none());
        assert!(s.advance_epoch().await.is_none());
        assert_eq!(s.current_epoch(), 2);
        assert_eq!(s.final_target.write_count().await, 0);
    }

    #[tokio::test]
    async fn failed_epochs_do_not_accumulate_reports() {
        let a = PeerId::from_public_key(b"a");
        let b = PeerId::from_public_key(b"b");
        let mut s = scheduler(&[], vec![(a, b, 1.0)]);

        for _ in 0..5 {
            assert!(s.advance_epoch().await.is_none());
        }
        assert!(s.collector.epochs().await.is_empty());
    }

    #[tokio::test]
    async fn abort_requested_during_seeding_is_not_lost() {
        let a = PeerId::from_public_key(b"a");
        let b = PeerId::from_public_key(b"b");
        let mut s = scheduler(&["a", "b"], vec![(a, b, 1.0), (b, a, 1.0)]);

        // The signal exists before seeding starts, as in `run`.
        let signal = AbortSignal::new();
        signal.abort();
        let report = s.advance_epoch_with(signal).await.unwrap();

        assert!(report.aborted);
        assert_eq!(report.iterations, 0);
        assert!(s.final_target.latest().await.is_none());
        assert!(s.collector.epochs().await.is_empty());
    }

    #[tokio::test]
    async fn run_stops_at_epoch_limit() {
        let mut s = scheduler(&["a"], Vec::new());
        s.run(Some(3)).await.unwrap();
        assert_eq!(s.current_epoch(), 3);
    }
}
