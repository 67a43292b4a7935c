// crates/lattice-reputation/tests/eigentrust_pipeline.rs
//
// End-to-end tests of the EigenTrust pipeline: network map -> initial trust,
// report collector -> calculator -> controller -> sinks.

use std::collections::BTreeSet;
use std::sync::Arc;

use lattice_core::{
    LatticeError, NetMap, NetmapSource, NodeInfo, PeerId, StaticNetmap, TrustValue, TRUST_ONE,
};
use lattice_reputation::{
    Calculator, CalculatorPrm, Controller, EigenTrustConfig, EpochState, FixedIterations,
    LocalTrustCollector, MemoryFinalTarget, MemoryIntermediateTarget, NetmapInitialTrust,
    WorkerPool,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn key(name: &str) -> Vec<u8> {
    format!("pubkey-{}", name).into_bytes()
}

fn peer(name: &str) -> PeerId {
    PeerId::from_public_key(&key(name))
}

fn netmap(names: &[&str]) -> Arc<dyn NetmapSource> {
    let nodes = names
        .iter()
        .map(|n| NodeInfo {
            public_key: key(n),
            address: format!("/dns4/{}/tcp/8080", n),
        })
        .collect();
    Arc::new(StaticNetmap::new(NetMap { epoch: 10, nodes }))
}

struct Node {
    controller: Controller,
    intermediate: MemoryIntermediateTarget,
    final_target: MemoryFinalTarget,
}

fn node(
    netmap: Arc<dyn NetmapSource>,
    collector: Arc<LocalTrustCollector>,
    alpha: f64,
    iterations: u32,
    pool_size: usize,
) -> Node {
    let intermediate = MemoryIntermediateTarget::new();
    let final_target = MemoryFinalTarget::new();
    let calculator = Calculator::new(CalculatorPrm {
        alpha,
        initial_trust_source: Some(Arc::new(NetmapInitialTrust::new(netmap, 1))),
        daughter_trust_source: Some(collector),
        intermediate_value_target: Some(Arc::new(intermediate.clone())),
        final_result_target: Some(Arc::new(final_target.clone())),
        worker_pool: Some(Arc::new(WorkerPool::new(pool_size).unwrap())),
    })
    .unwrap();
    let controller = Controller::new(
        Arc::new(calculator),
        Arc::new(FixedIterations::new(iterations).unwrap()),
    );
    Node {
        controller,
        intermediate,
        final_target,
    }
}

// ===========================================================================
// Closed-form scenarios
// ===========================================================================

/// A and B fully trust each other; with N=2 and alpha=0.8 every iteration
/// yields 0.8 * (1.0 * 0.5) + 0.2 * 0.5 = 0.5 for both.
#[tokio::test]
async fn mutual_pair_is_stable_at_one_half() {
    let collector = Arc::new(LocalTrustCollector::new());
    collector.observe(1, peer("a"), peer("b"), 1.0).await;
    collector.observe(1, peer("b"), peer("a"), 1.0).await;

    let n = node(netmap(&["a", "b"]), collector, 0.8, 3, 4);
    let report = n.controller.run_epoch(1).await.unwrap();

    let half = TrustValue::from_f64(0.5);
    let result = report.result.unwrap();
    assert_eq!(result.get(&peer("a")), Some(half));
    assert_eq!(result.get(&peer("b")), Some(half));

    let published = n.final_target.epoch_result(1).await;
    assert_eq!(published.len(), 2);
    assert!(published.values().all(|v| *v == half));
}

/// A single peer nobody reports on keeps only beta * initial trust.
#[tokio::test]
async fn lone_peer_keeps_damped_initial_trust() {
    let collector = Arc::new(LocalTrustCollector::new());
    collector.add_daughter(1, peer("a")).await;

    let n = node(netmap(&["a"]), collector, 0.8, 1, 1);
    let report = n.controller.run_epoch(1).await.unwrap();
    assert_eq!(
        report.result.unwrap().get(&peer("a")),
        Some(TrustValue::from_f64(0.2))
    );
}

// ===========================================================================
// Routing and result sets
// ===========================================================================

#[tokio::test]
async fn only_last_iteration_reaches_final_target() {
    let collector = Arc::new(LocalTrustCollector::new());
    collector.observe(3, peer("a"), peer("b"), 2.0).await;
    collector.observe(3, peer("b"), peer("c"), 1.0).await;
    collector.observe(3, peer("c"), peer("a"), 1.0).await;

    let n = node(netmap(&["a", "b", "c"]), collector, 0.5, 4, 2);
    n.controller.run_epoch(3).await.unwrap();

    // Iterations 0..=2 are intermediate, 3 is final.
    let iterations: Vec<u32> = n
        .intermediate
        .iterations()
        .await
        .iter()
        .map(|ei| ei.i())
        .collect();
    assert_eq!(iterations, vec![0, 1, 2]);
    assert_eq!(n.intermediate.write_count().await, 9);
    assert_eq!(n.final_target.epoch_result(3).await.len(), 3);
}

/// The snapshot's key set equals the daughter set and the values do not
/// depend on how the pool schedules per-peer work.
#[tokio::test]
async fn results_are_independent_of_pool_size() {
    let names: Vec<String> = (0..12).map(|i| format!("n{}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let collector = Arc::new(LocalTrustCollector::new());
    for (i, from) in refs.iter().enumerate() {
        for (j, to) in refs.iter().enumerate() {
            if i != j && (i * 7 + j * 3) % 5 != 0 {
                let weight = ((i + 2 * j) % 9 + 1) as f64;
                collector.observe(1, peer(from), peer(to), weight).await;
            }
        }
    }

    let serial = node(netmap(&refs), collector.clone(), 0.3, 5, 1);
    let parallel = node(netmap(&refs), collector.clone(), 0.3, 5, 8);

    let a = serial.controller.run_epoch(1).await.unwrap().result.unwrap();
    let b = parallel.controller.run_epoch(1).await.unwrap().result.unwrap();
    assert_eq!(a, b);

    let expected: BTreeSet<PeerId> = refs.iter().map(|n| peer(n)).collect();
    let keys: BTreeSet<PeerId> = a.peers().copied().collect();
    assert_eq!(keys, expected);
}

/// Trust stays a distribution: the per-peer values sum to about one.
#[tokio::test]
async fn global_trust_sums_to_about_one() {
    let collector = Arc::new(LocalTrustCollector::new());
    collector.observe(1, peer("a"), peer("b"), 0.8).await;
    collector.observe(1, peer("b"), peer("c"), 0.6).await;
    collector.observe(1, peer("c"), peer("a"), 0.9).await;
    collector.observe(1, peer("a"), peer("c"), 0.3).await;

    let n = node(netmap(&["a", "b", "c"]), collector, 0.85, 20, 3);
    let result = n.controller.run_epoch(1).await.unwrap().result.unwrap();
    let total: TrustValue = result.iter().map(|(_, v)| *v).sum();
    assert!(
        total.abs_diff(TRUST_ONE) <= TrustValue::from_f64(1e-6),
        "total trust {}",
        total
    );
}

// ===========================================================================
// Failure handling
// ===========================================================================

#[tokio::test]
async fn empty_network_map_fails_the_epoch() {
    let collector = Arc::new(LocalTrustCollector::new());
    collector.observe(1, peer("a"), peer("b"), 1.0).await;

    let n = node(netmap(&[]), collector, 0.5, 2, 2);
    let err = n.controller.run_epoch(1).await.unwrap_err();
    assert!(matches!(err, LatticeError::EmptyNetworkMap));
    assert_eq!(n.controller.state().await, EpochState::Failed { epoch: 1 });
    assert_eq!(n.final_target.write_count().await, 0);
}

#[tokio::test]
async fn config_builds_a_working_controller() {
    let config: EigenTrustConfig = toml::from_str(
        "alpha = 0.8\niterations = 50\nstabilization_tolerance = 0.000001\nworker_pool_size = 2",
    )
    .unwrap();

    let collector = Arc::new(LocalTrustCollector::new());
    collector.observe(1, peer("a"), peer("b"), 1.0).await;
    collector.observe(1, peer("b"), peer("a"), 1.0).await;

    let final_target = MemoryFinalTarget::new();
    let calculator = Calculator::new(CalculatorPrm {
        alpha: config.alpha,
        initial_trust_source: Some(Arc::new(NetmapInitialTrust::new(
            netmap(&["a", "b"]),
            config.netmap_diff,
        ))),
        daughter_trust_source: Some(collector),
        intermediate_value_target: Some(Arc::new(MemoryIntermediateTarget::new())),
        final_result_target: Some(Arc::new(final_target.clone())),
        worker_pool: Some(Arc::new(WorkerPool::new(config.worker_pool_size).unwrap())),
    })
    .unwrap();
    let controller = Controller::new(Arc::new(calculator), config.termination_policy().unwrap());

    // Values never move, so iterations 0 and 1 agree and iteration 2 is final.
    let report = controller.run_epoch(1).await.unwrap();
    assert_eq!(report.iterations, 3);
    assert_eq!(final_target.epoch_result(1).await.len(), 2);
}
