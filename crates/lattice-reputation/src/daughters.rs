// crates/lattice-reputation/src/daughters.rs
//
// The seam between the calculator and report collection.
//
// During an epoch each node acts as a "manager" for a set of daughters and
// collects what other nodes reported about them. The calculator pulls those
// reports here, once per daughter per iteration.

use std::sync::Arc;

use async_trait::async_trait;

use lattice_core::{EpochIteration, LatticeError, LocalTrust, PeerId};

/// Supplies the daughters of this node and the local trust reported about them.
#[async_trait]
pub trait DaughterTrustIteratorProvider: Send + Sync {
    /// Peers this node computes global trust for in the given iteration.
    async fn daughters(
        &self,
        epoch_iteration: EpochIteration,
    ) -> Result<Vec<PeerId>, LatticeError>;

    /// Local trust reports whose trustee is `daughter`.
    async fn daughter_trusts(
        &self,
        epoch_iteration: EpochIteration,
        daughter: &PeerId,
    ) -> Result<DaughterTrusts, LatticeError>;
}

/// Reports about a single daughter.
///
/// Cheap to clone; iterating does not consume it, so the sequence can be
/// walked again from the start.
#[derive(Debug, Clone, Default)]
pub struct DaughterTrusts(Arc<[LocalTrust]>);

impl DaughterTrusts {
    pub fn iter(&self) -> std::slice::Iter<'_, LocalTrust> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<LocalTrust>> for DaughterTrusts {
    fn from(trusts: Vec<LocalTrust>) -> Self {
        DaughterTrusts(trusts.into())
    }
}

impl<'a> IntoIterator for &'a DaughterTrusts {
    type Item = &'a LocalTrust;
    type IntoIter = std::slice::Iter<'a, LocalTrust>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
