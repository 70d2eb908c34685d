//! Opaque caller values referenced by checkpoint manifests.

use sha3::{Digest, Sha3_256};

use crate::block_id::Hash;

/// One caller-serialized value, stored content-addressed. The store never
/// looks inside the bytes; the hash is the identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value {
    bytes: Vec<u8>,
}

impl Value {
    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Content address: SHA3-256 of the serialized bytes.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha3_256::new();
        hasher.update(&self.bytes);
        let out = hasher.finalize();
        let mut h = [0u8; 32];
        h.copy_from_slice(&out[..32]);
        h
    }
}
