//! Error taxonomy for the checkpoint store.
//!
//! Save and restore surface their errors to the caller. Reconciliation, GC
//! and trim are deliberately forgiving: on a decode failure they stop the
//! operation quietly, because leaking a record is cheaper than crashing a
//! validator on malformed history.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Lookup outside `[oldest, newest]`, or an empty store at restore time.
    #[error("no checkpoints in database")]
    NotFound,
    #[error("codec error: {0}")]
    Corrupt(#[from] crate::wire::CodecError),
    #[error("rocksdb error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("{0}")]
    ChainUnavailable(#[from] crate::chain::ChainError),
    #[error("checkpoint store init: {0}")]
    Init(String),
    #[error("internal: {0}")]
    Internal(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The caller's restore callback rejected the checkpoint.
    #[error("restore callback: {0}")]
    Restore(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
