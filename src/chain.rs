//! Canonical-chain lookups consumed by reorg reconciliation.

use thiserror::Error;

use crate::block_id::BlockId;

/// The chain client could not answer a canonical lookup. Reconciliation
/// treats this as "give up quietly and retry on the next invocation".
#[derive(Debug, Error)]
#[error("chain client unavailable: {0}")]
pub struct ChainError(pub String);

/// A small observer interface so the store can ask "which block id is
/// canonical at this height" without knowing *how* the answer is produced
/// (RPC, loopback, a test table).
pub trait ChainClient {
    fn block_id_at(&self, height: u64) -> Result<BlockId, ChainError>;
}
