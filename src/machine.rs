//! Machine-state snapshots.
//!
//! A machine is the execution-engine side of a checkpoint: an opaque,
//! content-addressed blob the validator's interpreter knows how to revive.
//! The pristine initial machine is bootstrapped from the configured code
//! file at store construction.

use std::path::Path;

use sha3::{Digest, Sha3_256};

use crate::block_id::Hash;
use crate::error::Result;
use crate::storage::CheckpointStorage;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Machine {
    bytes: Vec<u8>,
}

impl Machine {
    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Bootstrap a machine from an executable code file.
    pub fn from_code_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Content address: SHA3-256 of the snapshot bytes.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha3_256::new();
        hasher.update(&self.bytes);
        let out = hasher.finalize();
        let mut h = [0u8; 32];
        h.copy_from_slice(&out[..32]);
        h
    }

    /// Write this machine and everything it depends on into the store,
    /// returning its content hash.
    pub fn checkpoint(&self, st: &CheckpointStorage) -> Result<Hash> {
        st.put_machine(self)
    }
}
