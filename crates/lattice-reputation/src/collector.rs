// crates/lattice-reputation/src/collector.rs
//
// In-memory collection of local trust reports, one matrix per epoch.
//
// Each entry T(from, to) is how much node `from` trusts node `to` based on
// its own interactions during the epoch. Raw observations are row-normalized
// per truster before the calculator sees them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use lattice_core::{EpochIteration, LatticeError, LocalTrust, PeerId, TrustValue, TRUST_SCALE};

use crate::daughters::{DaughterTrustIteratorProvider, DaughterTrusts};

/// Raw observations of a single epoch.
#[derive(Debug, Default)]
struct EpochReports {
    /// Sparse observations: (truster, trustee) -> accumulated weight.
    observations: BTreeMap<(PeerId, PeerId), f64>,
    /// Peers this node computes trust for, with or without reports.
    daughters: BTreeSet<PeerId>,
    /// Normalized reports grouped by trustee. Dropped on every write.
    index: Option<Arc<HashMap<PeerId, DaughterTrusts>>>,
}

impl EpochReports {
    /// Row-normalize the observations: C(i, j) = T(i, j) / sum_k T(i, k).
    ///
    /// Each row sums to exactly `TRUST_ONE`; the rounding remainder goes to
    /// the row's largest entry. Trusters whose observations sum to zero
    /// contribute nothing.
    fn normalize(&self) -> HashMap<PeerId, DaughterTrusts> {
        let mut rows: BTreeMap<PeerId, Vec<(PeerId, f64)>> = BTreeMap::new();
        for (&(from, to), &weight) in &self.observations {
            if weight > 0.0 {
                rows.entry(from).or_default().push((to, weight));
            }
        }

        let mut grouped: HashMap<PeerId, Vec<LocalTrust>> = HashMap::new();
        for (from, row) in rows {
            for (to, value) in normalize_row(&row) {
                grouped
                    .entry(to)
                    .or_default()
                    .push(LocalTrust::new(from, to, value));
            }
        }

        grouped
            .into_iter()
            .map(|(to, trusts)| (to, DaughterTrusts::from(trusts)))
            .collect()
    }
}

fn normalize_row(row: &[(PeerId, f64)]) -> Vec<(PeerId, TrustValue)> {
    let row_sum: f64 = row.iter().map(|(_, w)| w).sum();
    if !row_sum.is_finite() || row_sum <= 0.0 {
        return Vec::new();
    }

    let mut units: Vec<u64> = row
        .iter()
        .map(|(_, w)| TrustValue::from_f64(w / row_sum).units())
        .collect();
    let total: u64 = units.iter().sum();
    if let Some(largest) = (0..units.len()).max_by_key(|&k| units[k]) {
        units[largest] = if total > TRUST_SCALE {
            units[largest].saturating_sub(total - TRUST_SCALE)
        } else {
            units[largest] + (TRUST_SCALE - total)
        };
    }

    row.iter()
        .zip(units)
        .filter_map(|(&(to, _), u)| TrustValue::from_units(u).map(|v| (to, v)))
        .collect()
}

/// Collects local trust observations and serves them to the calculator.
#[derive(Debug, Default)]
pub struct LocalTrustCollector {
    epochs: RwLock<BTreeMap<u64, EpochReports>>,
}

impl LocalTrustCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer this node evaluates in `epoch`, even if nobody reports on it.
    pub async fn add_daughter(&self, epoch: u64, peer: PeerId) {
        let mut epochs = self.epochs.write().await;
        let reports = epochs.entry(epoch).or_default();
        reports.daughters.insert(peer);
        reports.index = None;
    }

    /// Record that `truster` observed `weight` worth of good behaviour from `trustee`.
    ///
    /// Weights accumulate. Negative and NaN weights count as zero; self-trust
    /// is ignored.
    pub async fn observe(&self, epoch: u64, truster: PeerId, trustee: PeerId, weight: f64) {
        if truster == trustee {
            tracing::debug!("Epoch {}: ignoring self-trust report from {}", epoch, truster);
            return;
        }
        let weight = if weight.is_nan() { 0.0 } else { weight.max(0.0) };

        let mut epochs = self.epochs.write().await;
        let reports = epochs.entry(epoch).or_default();
        *reports.observations.entry((truster, trustee)).or_insert(0.0) += weight;
        reports.daughters.insert(trustee);
        reports.index = None;
    }

    /// All normalized reports of `epoch`.
    pub async fn local_trusts(&self, epoch: u64) -> Vec<LocalTrust> {
        let index = self.index(epoch).await;
        let mut trusts: Vec<LocalTrust> = index.values().flat_map(|t| t.iter().copied()).collect();
        trusts.sort_by(|a, b| (a.truster(), a.trustee()).cmp(&(b.truster(), b.trustee())));
        trusts
    }

    /// Drop every epoch older than `epoch`.
    pub async fn retain_from(&self, epoch: u64) {
        let mut epochs = self.epochs.write().await;
        let kept = epochs.split_off(&epoch);
        *epochs = kept;
    }

    /// Epochs currently held.
    pub async fn epochs(&self) -> Vec<u64> {
        self.epochs.read().await.keys().copied().collect()
    }

    async fn index(&self, epoch: u64) -> Arc<HashMap<PeerId, DaughterTrusts>> {
        {
            let epochs = self.epochs.read().await;
            match epochs.get(&epoch) {
                None => return Arc::new(HashMap::new()),
                Some(reports) => {
                    if let Some(index) = &reports.index {
                        return index.clone();
                    }
                }
            }
        }

        let mut epochs = self.epochs.write().await;
        let Some(reports) = epochs.get_mut(&epoch) else {
            return Arc::new(HashMap::new());
        };
        if let Some(index) = &reports.index {
            return index.clone();
        }
        let index = Arc::new(reports.normalize());
        reports.index = Some(index.clone());
        index
    }
}

#[async_trait]
impl DaughterTrustIteratorProvider for LocalTrustCollector {
    async fn daughters(
        &self,
        epoch_iteration: EpochIteration,
    ) -> Result<Vec<PeerId>, LatticeError> {
        let epochs = self.epochs.read().await;
        Ok(epochs
            .get(&epoch_iteration.epoch())
            .map(|r| r.daughters.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn daughter_trusts(
        &self,
        epoch_iteration: EpochIteration,
        daughter: &PeerId,
    ) -> Result<DaughterTrusts, LatticeError> {
        let index = self.index(epoch_iteration.epoch()).await;
        Ok(index.get(daughter).cloned().unwrap_or_default())
    }
}
