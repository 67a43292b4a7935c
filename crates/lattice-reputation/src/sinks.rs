// crates/lattice-reputation/src/sinks.rs
//
// Destinations for iteration outputs.
//
// Non-terminal iterations go to the intermediate target, which the outbound
// messaging layer uses to propagate values for the next iteration. The last
// iteration of an epoch goes to the final target, read by placement
// weighting and reporting. Writers are opened per iteration (or epoch),
// closed once the calculator's barrier has passed, and discarded instead
// when the iteration fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use lattice_core::{EpochIteration, LatticeError, PeerId, TrustValue};

/// Receives the non-terminal values of one iteration.
///
/// Called concurrently from worker tasks.
#[async_trait]
pub trait IntermediateWriter: Send + Sync {
    async fn write(
        &self,
        peer: &PeerId,
        epoch_iteration: EpochIteration,
        value: TrustValue,
    ) -> Result<(), LatticeError>;

    /// Flush after every value of the iteration was written.
    async fn close(&self) -> Result<(), LatticeError> {
        Ok(())
    }

    /// Drop everything written so far; the iteration failed.
    async fn discard(&self) -> Result<(), LatticeError> {
        Ok(())
    }
}

/// Opens an intermediate writer per iteration.
#[async_trait]
pub trait IntermediateWriterProvider: Send + Sync {
    async fn init_writer(
        &self,
        epoch_iteration: EpochIteration,
    ) -> Result<Arc<dyn IntermediateWriter>, LatticeError>;
}

/// Receives the final values of an epoch.
///
/// Called concurrently from worker tasks.
#[async_trait]
pub trait FinalWriter: Send + Sync {
    async fn write(
        &self,
        peer: &PeerId,
        epoch: u64,
        value: TrustValue,
    ) -> Result<(), LatticeError>;

    async fn close(&self) -> Result<(), LatticeError> {
        Ok(())
    }

    /// Drop everything written so far; the last iteration failed.
    async fn discard(&self) -> Result<(), LatticeError> {
        Ok(())
    }
}

/// Opens a final writer per epoch.
#[async_trait]
pub trait FinalResultTarget: Send + Sync {
    async fn init_writer(&self, epoch: u64) -> Result<Arc<dyn FinalWriter>, LatticeError>;
}

type PeerValues = BTreeMap<PeerId, TrustValue>;

/// Per-writer staging area. Values become visible only on `close`, which
/// replaces whatever an earlier run stored under the same key.
struct Staged<K: Ord> {
    key: K,
    pending: RwLock<PeerValues>,
    published: Arc<RwLock<BTreeMap<K, PeerValues>>>,
}

impl<K: Ord + Copy> Staged<K> {
    fn new(key: K, published: Arc<RwLock<BTreeMap<K, PeerValues>>>) -> Self {
        Self {
            key,
            pending: RwLock::new(BTreeMap::new()),
            published,
        }
    }

    async fn stage(&self, peer: &PeerId, value: TrustValue) {
        self.pending.write().await.insert(*peer, value);
    }

    async fn publish(&self) {
        let values = std::mem::take(&mut *self.pending.write().await);
        self.published.write().await.insert(self.key, values);
    }

    async fn clear(&self) {
        self.pending.write().await.clear();
    }
}

/// Records intermediate values in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryIntermediateTarget {
    values: Arc<RwLock<BTreeMap<EpochIteration, PeerValues>>>,
}

impl MemoryIntermediateTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values of `epoch_iteration` whose writer was closed.
    pub async fn values(&self, epoch_iteration: EpochIteration) -> PeerValues {
        self.values
            .read()
            .await
            .get(&epoch_iteration)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of published values across all iterations.
    pub async fn write_count(&self) -> usize {
        self.values.read().await.values().map(BTreeMap::len).sum()
    }

    /// Iterations with a closed writer.
    pub async fn iterations(&self) -> Vec<EpochIteration> {
        self.values.read().await.keys().copied().collect()
    }
}

#[async_trait]
impl IntermediateWriter for Staged<EpochIteration> {
    async fn write(
        &self,
        peer: &PeerId,
        epoch_iteration: EpochIteration,
        value: TrustValue,
    ) -> Result<(), LatticeError> {
        if epoch_iteration != self.key {
            return Err(LatticeError::Sink(format!(
                "writer of {} received a value for {}",
                self.key, epoch_iteration
            )));
        }
        self.stage(peer, value).await;
        Ok(())
    }

    async fn close(&self) -> Result<(), LatticeError> {
        self.publish().await;
        Ok(())
    }

    async fn discard(&self) -> Result<(), LatticeError> {
        self.clear().await;
        Ok(())
    }
}

#[async_trait]
impl IntermediateWriterProvider for MemoryIntermediateTarget {
    async fn init_writer(
        &self,
        epoch_iteration: EpochIteration,
    ) -> Result<Arc<dyn IntermediateWriter>, LatticeError> {
        Ok(Arc::new(Staged::new(epoch_iteration, self.values.clone())))
    }
}

/// Records final epoch results in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFinalTarget {
    results: Arc<RwLock<BTreeMap<u64, PeerValues>>>,
}

impl MemoryFinalTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Final values of `epoch`.
    pub async fn epoch_result(&self, epoch: u64) -> PeerValues {
        self.results
            .read()
            .await
            .get(&epoch)
            .cloned()
            .unwrap_or_default()
    }

    /// The most recent epoch with results, and those results.
    pub async fn latest(&self) -> Option<(u64, PeerValues)> {
        self.results
            .read()
            .await
            .iter()
            .next_back()
            .map(|(epoch, values)| (*epoch, values.clone()))
    }

    pub async fn write_count(&self) -> usize {
        self.results.read().await.values().map(BTreeMap::len).sum()
    }
}

#[async_trait]
impl FinalWriter for Staged<u64> {
    async fn write(
        &self,
        peer: &PeerId,
        epoch: u64,
        value: TrustValue,
    ) -> Result<(), LatticeError> {
        if epoch != self.key {
            return Err(LatticeError::Sink(format!(
                "writer of epoch {} received a value for epoch {}",
                self.key, epoch
            )));
        }
        self.stage(peer, value).await;
        Ok(())
    }

    async fn close(&self) -> Result<(), LatticeError> {
        self.publish().await;
        Ok(())
    }

    async fn discard(&self) -> Result<(), LatticeError> {
        self.clear().await;
        Ok(())
    }
}

#[async_trait]
impl FinalResultTarget for MemoryFinalTarget {
    async fn init_writer(&self, epoch: u64) -> Result<Arc<dyn FinalWriter>, LatticeError> {
        Ok(Arc::new(Staged::new(epoch, self.results.clone())))
    }
}
