// tests/support/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use rollup_checkpoint::{
    Address, BlockId, ChainClient, ChainError, CheckpointContext, CheckpointStore, CheckpointerCfg,
    Hash,
};
use tempfile::TempDir;

/// Fresh on-disk store rooted in a temp dir, with a throwaway code file for
/// the initial machine. Must run inside a tokio runtime (the store spawns
/// its writer task at open).
pub fn temp_store() -> (CheckpointStore, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let code = dir.path().join("machine.code");
    std::fs::write(&code, b"demo machine code").expect("write code file");

    let cfg = CheckpointerCfg {
        rollup_address: Address::from_bytes([0x11; 20]),
        code_file_path: code,
        database_path: dir.path().join("db"),
        max_reorg_depth: 32,
        force_fresh_start: false,
    };
    let store = CheckpointStore::open(&cfg).expect("open store");
    (store, dir)
}

/// 32-byte tag filled with `n`, mirroring the `H(n)` shorthand in docs.
pub fn h(n: u8) -> Hash {
    [n; 32]
}

pub fn id(height: u64, tag: u8) -> BlockId {
    BlockId::new(height, h(tag))
}

/// Chain client answering from a fixed height -> id table.
pub struct MapChain {
    canonical: HashMap<u64, BlockId>,
}

impl MapChain {
    pub fn new(ids: &[BlockId]) -> Self {
        Self { canonical: ids.iter().map(|id| (id.height, *id)).collect() }
    }
}

impl ChainClient for MapChain {
    fn block_id_at(&self, height: u64) -> Result<BlockId, ChainError> {
        self.canonical
            .get(&height)
            .copied()
            .ok_or_else(|| ChainError(format!("no canonical block at height {height}")))
    }
}

/// Submit a save and block until its completion signal fires.
pub async fn save_and_wait(
    store: &CheckpointStore,
    at: BlockId,
    contents: &[u8],
    ctx: CheckpointContext,
) {
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    store.save_async(at, contents.to_vec(), ctx, Some(done_tx)).await;
    done_rx.await.expect("writer dropped the signal").expect("save failed");
}

/// Poll `cond` until it holds or ~10s pass (the background GC runs on an
/// interval, so reclamation is eventually-visible).
pub async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("timed out waiting for {what}");
}
