//! The public checkpoint store facade.
//!
//! Holds nothing beyond the storage adapter and the writer handle; every
//! operation composes the index, reconciler, GC and writer behind the
//! collaborator contracts. Saves are asynchronous and FIFO through the
//! writer task; restores reconcile against the canonical chain first, then
//! hand the newest surviving checkpoint to the caller's callback.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::block_id::{BlockId, Hash};
use crate::chain::ChainClient;
use crate::config::CheckpointerCfg;
use crate::context::{CheckpointContext, RestoreContext};
use crate::error::{Result, StoreError};
use crate::index;
use crate::machine::Machine;
use crate::reorg;
use crate::storage::CheckpointStorage;
use crate::value::Value;
use crate::wire;
use crate::writer::{CheckpointWriter, WriterHandle, WriterMsg};

pub struct CheckpointStore {
    st: Arc<CheckpointStorage>,
    writer: WriterHandle,
    max_reorg_depth: u64,
}

impl CheckpointStore {
    /// Open (or create) the store described by `cfg` and start its writer
    /// task. Must be called from within a tokio runtime.
    pub fn open(cfg: &CheckpointerCfg) -> Result<Self> {
        let db_path = cfg.db_path();
        if cfg.force_fresh_start {
            match std::fs::remove_dir_all(&db_path) {
                Ok(()) => {
                    log::info!("checkpoint-store: fresh start, removed {}", db_path.display())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StoreError::Init(format!(
                        "fresh start at {}: {e}",
                        db_path.display()
                    )))
                }
            }
        }

        let st = Arc::new(CheckpointStorage::open(&db_path, &cfg.code_file_path)?);
        let writer = CheckpointWriter::spawn(st.clone());
        log::info!("checkpoint-store: opened at {}", db_path.display());
        Ok(Self { st, writer, max_reorg_depth: cfg.max_reorg_depth })
    }

    /// True iff at least one checkpoint has been committed.
    pub fn has_state(&self) -> bool {
        matches!(self.st.get_bytes(wire::KEY_METADATA), Ok(Some(ref buf)) if !buf.is_empty())
    }

    /// Reconcile against the canonical chain, then hand the newest surviving
    /// checkpoint's contents and hash resolver to `restore_cb`.
    ///
    /// Fails with [`StoreError::NotFound`] on an empty (or fully reorged)
    /// store and surfaces [`StoreError::Corrupt`] for undecodable metadata.
    /// Checkpoint lookup compares heights only: two checkpoints saved at
    /// the same height cannot be told apart.
    pub fn restore_latest<F>(&self, client: &dyn ChainClient, restore_cb: F) -> Result<()>
    where
        F: FnOnce(&[u8], &RestoreContext<'_>) -> anyhow::Result<()>,
    {
        reorg::reconcile(&self.st, client);

        let meta = index::read_metadata(&self.st)?.ok_or(StoreError::NotFound)?;
        let (contents, ctx) =
            index::restore(&self.st, &meta.newest)?.ok_or(StoreError::NotFound)?;
        restore_cb(&contents, &ctx).map_err(StoreError::Restore)
    }

    /// Contents and hash resolver for the checkpoint at `id`, if its height
    /// is inside the stored range.
    pub fn restore_checkpoint(
        &self,
        id: &BlockId,
    ) -> Result<Option<(Vec<u8>, RestoreContext<'_>)>> {
        index::restore(&self.st, id)
    }

    /// Newest checkpoint id, if any.
    pub fn tip(&self) -> Result<Option<BlockId>> {
        index::tip(&self.st)
    }

    /// Queue an asynchronous save of `contents` plus the subobjects recorded
    /// in `ctx`. Blocks (awaits) only when the writer's submission channel
    /// is full. The optional `done` signal fires once the checkpoint is
    /// durable, or with the error that stopped it.
    pub async fn save_async(
        &self,
        id: BlockId,
        contents: Vec<u8>,
        ctx: CheckpointContext,
        done: Option<oneshot::Sender<Result<()>>>,
    ) {
        self.writer.submit(WriterMsg::Save { id, contents, ctx, done }).await;
    }

    /// Unlink every checkpoint below `height` off the head of the history
    /// and queue it for GC. Best-effort; never fails the caller.
    pub fn trim_before(&self, height: u64) {
        index::trim_head_until(&self.st, height);
    }

    /// Advisory reorg horizon from construction. `trim_before` callers use
    /// it to pick a retention floor; the store does not enforce it.
    pub fn max_reorg_depth(&self) -> u64 {
        self.max_reorg_depth
    }

    /// Pristine machine bootstrapped from the configured code file.
    pub fn initial_machine(&self) -> Machine {
        self.st.initial_machine()
    }

    pub fn get_value(&self, hash: &Hash) -> Option<Value> {
        self.st.get_value(hash).ok().flatten()
    }

    pub fn get_machine(&self, hash: &Hash) -> Option<Machine> {
        self.st.get_machine(hash).ok().flatten()
    }

    /// Flush every accepted save and stop the writer task. The database
    /// itself closes when the last reference to the storage drops.
    pub async fn close(self) {
        let CheckpointStore { writer, .. } = self;
        writer.close().await;
    }
}
