// crates/lattice-core/src/peer.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LatticeError;

/// Identifier of a node on the Lattice network.
///
/// Derived from the node's public key (SHA-256 of the key bytes), so any
/// peer can compute it from a network map entry without extra lookups.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId([u8; 32]);

impl PeerId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        PeerId(bytes)
    }

    /// Derive the identifier of the node owning `public_key`.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest = Sha256::digest(public_key);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        PeerId(bytes)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, LatticeError> {
        let raw = hex::decode(s)
            .map_err(|e| LatticeError::Config(format!("invalid peer id {:?}: {}", s, e)))?;
        let bytes: [u8; 32] = raw.try_into().map_err(|raw: Vec<u8>| {
            LatticeError::Config(format!("peer id must be 32 bytes, got {}", raw.len()))
        })?;
        Ok(PeerId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", &hex::encode(self.0)[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_from_public_key_is_stable() {
        let a = PeerId::from_public_key(b"node-a-public-key");
        let b = PeerId::from_public_key(b"node-a-public-key");
        let c = PeerId::from_public_key(b"node-c-public-key");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hex_round_trip() {
        let id = PeerId::new([7u8; 32]);
        let parsed = PeerId::from_hex(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn hex_with_wrong_length_is_rejected() {
        assert!(PeerId::from_hex("abcd").is_err());
        assert!(PeerId::from_hex("not hex").is_err());
    }
}
