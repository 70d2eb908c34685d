//! Single-consumer async write pipeline.
//!
//! All mutation of the checkpoint index funnels through one background task
//! reading a bounded submission channel; job processing order is submission
//! order and no other lock guards the index. Each save job may carry a
//! completion signal, which fires strictly after the job's KV writes have
//! returned. On shutdown the task drains every job it already accepted
//! (their signals still fire) and then exits. The same task drives GC: one
//! dead-queue tick after each save and on an idle interval.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::block_id::BlockId;
use crate::context::CheckpointContext;
use crate::error::Result;
use crate::gc;
use crate::index;
use crate::storage::CheckpointStorage;

/// Submission-channel bound; producers await when it is full.
const WRITE_QUEUE_CAPACITY: usize = 64;
/// Idle cadence for dead-queue drainage.
const GC_TICK_INTERVAL: Duration = Duration::from_millis(500);

pub(crate) enum WriterMsg {
    Save {
        id: BlockId,
        contents: Vec<u8>,
        ctx: CheckpointContext,
        done: Option<oneshot::Sender<Result<()>>>,
    },
    /// Drain everything already accepted, then exit.
    Shutdown,
}

pub(crate) struct WriterHandle {
    tx: mpsc::Sender<WriterMsg>,
    join: Option<JoinHandle<()>>,
}

impl WriterHandle {
    pub(crate) async fn submit(&self, msg: WriterMsg) {
        if self.tx.send(msg).await.is_err() {
            // shutdown already began; the job (and its signal) is dropped
            log::warn!("checkpoint-writer: submission after shutdown dropped");
        }
    }

    pub(crate) async fn close(mut self) {
        let _ = self.tx.send(WriterMsg::Shutdown).await;
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

pub(crate) struct CheckpointWriter {
    rx: mpsc::Receiver<WriterMsg>,
    st: Arc<CheckpointStorage>,
}

impl CheckpointWriter {
    /// Spawn the writer task. Must be called from within a tokio runtime.
    pub(crate) fn spawn(st: Arc<CheckpointStorage>) -> WriterHandle {
        let (tx, rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let worker = Self { rx, st };
        let join = tokio::spawn(worker.run());
        log::info!("checkpoint-writer: spawned with queue_capacity={WRITE_QUEUE_CAPACITY}");
        WriterHandle { tx, join: Some(join) }
    }

    async fn run(mut self) {
        let mut gc_timer = tokio::time::interval(GC_TICK_INTERVAL);
        gc_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut saves_total: u64 = 0;

        loop {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(WriterMsg::Save { id, contents, ctx, done }) => {
                        self.process_save(&id, &contents, &ctx, done);
                        saves_total += 1;
                        gc::gc_tick(&self.st);
                    }
                    Some(WriterMsg::Shutdown) | None => break,
                },
                _ = gc_timer.tick() => gc::gc_tick(&self.st),
            }
        }

        // drain jobs accepted before shutdown; their signals still fire
        while let Ok(msg) = self.rx.try_recv() {
            if let WriterMsg::Save { id, contents, ctx, done } = msg {
                self.process_save(&id, &contents, &ctx, done);
                saves_total += 1;
            }
        }
        log::info!("checkpoint-writer: stopped, saves_total={saves_total}");
    }

    fn process_save(
        &self,
        id: &BlockId,
        contents: &[u8],
        ctx: &CheckpointContext,
        done: Option<oneshot::Sender<Result<()>>>,
    ) {
        let start = Instant::now();
        let result = index::save_checkpoint(&self.st, id, contents, ctx);
        match &result {
            Ok(()) => log::debug!("checkpoint-writer: saved checkpoint at height {}", id.height),
            Err(e) => log::error!("checkpoint-writer: save at height {} failed: {e}", id.height),
        }
        crate::metrics::observe_save(start.elapsed().as_secs_f64());
        if let Some(done) = done {
            let _ = done.send(result);
        }
    }
}
