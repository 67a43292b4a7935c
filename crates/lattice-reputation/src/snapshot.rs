// crates/lattice-reputation/src/snapshot.rs

use std::collections::BTreeMap;

use serde::Serialize;

use lattice_core::{EpochIteration, PeerId, TrustValue, TRUST_ZERO};

/// Global trust produced by one completed iteration.
///
/// Immutable once built; the controller hands it to the next iteration as
/// its "previous" input and then drops it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalTrust {
    epoch_iteration: EpochIteration,
    values: BTreeMap<PeerId, TrustValue>,
}

impl GlobalTrust {
    pub fn new(epoch_iteration: EpochIteration, values: BTreeMap<PeerId, TrustValue>) -> Self {
        Self {
            epoch_iteration,
            values,
        }
    }

    /// The iteration that produced this snapshot.
    pub fn epoch_iteration(&self) -> EpochIteration {
        self.epoch_iteration
    }

    pub fn get(&self, peer: &PeerId) -> Option<TrustValue> {
        self.values.get(peer).copied()
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.values.contains_key(peer)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Peers in ascending order.
    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, &TrustValue)> {
        self.values.iter()
    }

    /// Largest per-peer difference between two snapshots (L-infinity norm).
    ///
    /// A peer missing from one side counts as `TRUST_ZERO` there.
    pub fn distance(&self, other: &GlobalTrust) -> TrustValue {
        let own = self
            .values
            .iter()
            .map(|(peer, v)| v.abs_diff(other.get(peer).unwrap_or(TRUST_ZERO)));
        let missing = other
            .values
            .iter()
            .filter(|(peer, _)| !self.values.contains_key(peer))
            .map(|(_, v)| *v);
        own.chain(missing).max().unwrap_or(TRUST_ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(values: &[(u8, f64)]) -> GlobalTrust {
        GlobalTrust::new(
            EpochIteration::new(1, 0),
            values
                .iter()
                .map(|&(b, v)| (PeerId::new([b; 32]), TrustValue::from_f64(v)))
                .collect(),
        )
    }

    #[test]
    fn distance_is_largest_per_peer_change() {
        let a = snapshot(&[(1, 0.5), (2, 0.3)]);
        let b = snapshot(&[(1, 0.45), (2, 0.4)]);
        assert_eq!(a.distance(&b), TrustValue::from_f64(0.1));
        assert_eq!(b.distance(&a), TrustValue::from_f64(0.1));
        assert_eq!(a.distance(&a), TRUST_ZERO);
    }

    #[test]
    fn missing_peers_count_as_zero() {
        let a = snapshot(&[(1, 0.5)]);
        let b = snapshot(&[(1, 0.5), (2, 0.2)]);
        assert_eq!(a.distance(&b), TrustValue::from_f64(0.2));
        assert_eq!(b.distance(&a), TrustValue::from_f64(0.2));
    }
}
