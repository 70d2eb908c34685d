//! Deferred deletion: the dead queue and its incremental consumer.
//!
//! Physically deleting a checkpoint fans out to every value and machine its
//! manifest names, so unlinked checkpoints are only *queued* here and
//! reclaimed a few per tick from the writer task. The consumer is
//! idempotent: ids whose records are already gone simply drop out of the
//! queue, and within one entry the manifest key is deleted last so an
//! interrupted tick can be replayed.

use crate::block_id::BlockId;
use crate::error::Result;
use crate::storage::CheckpointStorage;
use crate::wire::{self, DeadQueue, Manifest};

/// Append `id` to the persisted dead queue.
///
/// Best-effort: if the queue is unreadable we leak one record rather than
/// fail the caller's unlink.
pub(crate) fn enqueue(st: &CheckpointStorage, id: &BlockId) {
    let _guard = st.dead_queue_lock.lock();
    let mut queue = match read_queue(st) {
        Ok(queue) => queue,
        Err(e) => {
            log::warn!("gc: dead queue unreadable, dropping enqueue of height {}: {e}", id.height);
            return;
        }
    };
    queue.ids.push(*id);
    if let Err(e) = st.put_bytes(wire::KEY_DEAD_QUEUE, &queue.encode()) {
        log::warn!("gc: failed to persist dead queue: {e}");
        return;
    }
    crate::metrics::observe_dead_queue_len(queue.ids.len() as i64);
}

fn read_queue(st: &CheckpointStorage) -> Result<DeadQueue> {
    match st.get_bytes(wire::KEY_DEAD_QUEUE)? {
        Some(buf) => Ok(DeadQueue::decode(&buf)?),
        None => Ok(DeadQueue::default()),
    }
}

/// One bounded drainage step: reclaim `max(1, ceil(len / 10))` ids off the
/// queue head, or nothing when the queue is empty.
pub(crate) fn gc_tick(st: &CheckpointStorage) {
    let _guard = st.dead_queue_lock.lock();
    let mut queue = match read_queue(st) {
        Ok(queue) => queue,
        Err(e) => {
            log::warn!("gc: dead queue unreadable, skipping tick: {e}");
            return;
        }
    };
    if queue.ids.is_empty() {
        return;
    }

    // ceil(len/10) is already >= 1 for a non-empty queue
    let batch = (queue.ids.len() + 9) / 10;
    let mut reclaimed = 0u64;
    for id in queue.ids.drain(..batch) {
        if delete_one(st, &id) {
            reclaimed += 1;
        }
    }

    if let Err(e) = st.put_bytes(wire::KEY_DEAD_QUEUE, &queue.encode()) {
        log::warn!("gc: failed to persist dead queue after tick: {e}");
        return;
    }
    if reclaimed > 0 {
        log::debug!("gc: reclaimed {reclaimed} checkpoint(s), {} queued", queue.ids.len());
    }
    crate::metrics::observe_gc_reclaimed(reclaimed);
    crate::metrics::observe_dead_queue_len(queue.ids.len() as i64);
}

/// Physically delete one checkpoint: its subobjects, then contents and
/// links, manifest last. Returns false when there is nothing (left) to do.
fn delete_one(st: &CheckpointStorage, id: &BlockId) -> bool {
    let manifest_key = wire::manifest_key(id);
    let manifest = match st.get_bytes(&manifest_key) {
        Ok(Some(buf)) => match Manifest::decode(&buf) {
            Ok(manifest) => manifest,
            Err(e) => {
                log::warn!("gc: undecodable manifest at height {}, leaking it: {e}", id.height);
                return false;
            }
        },
        // already reclaimed, or unreadable: either way this entry is done
        _ => return false,
    };

    for hash in &manifest.value_hashes {
        if let Err(e) = st.delete_value(hash) {
            log::warn!("gc: failed to delete value: {e}");
        }
    }
    for hash in &manifest.machine_hashes {
        if let Err(e) = st.delete_machine(hash) {
            log::warn!("gc: failed to delete machine: {e}");
        }
    }
    let _ = st.delete_bytes(&wire::contents_key(id));
    let _ = st.delete_bytes(&wire::links_key(id));
    let _ = st.delete_bytes(&manifest_key);
    true
}
