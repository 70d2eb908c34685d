//! The checkpoint index: a doubly-linked history layered on the flat record
//! keyspace.
//!
//! Each saved block owns three records (`manifest:`, `contents:`, `links:`)
//! and the `metadata` singleton points at both ends of the chain. Links are
//! stored explicitly rather than derived from heights, so the history may
//! have gaps and truncation is one pointer swing per step. The tip's `next`
//! self-links; so does the oldest record's `prev`.
//!
//! Writes here run on the single writer task (saves) or on the caller's
//! task for reconciliation and trim; write *order* within each operation is
//! what keeps a crash mid-operation recoverable: subobjects before the
//! manifest that names them, record triple before the previous tip's
//! pointer, metadata last.

use crate::block_id::BlockId;
use crate::context::{CheckpointContext, RestoreContext};
use crate::error::Result;
use crate::gc;
use crate::machine::Machine;
use crate::storage::CheckpointStorage;
use crate::value::Value;
use crate::wire::{self, Links, Manifest, Metadata};

pub(crate) fn read_metadata(st: &CheckpointStorage) -> Result<Option<Metadata>> {
    match st.get_bytes(wire::KEY_METADATA)? {
        Some(buf) if !buf.is_empty() => Ok(Some(Metadata::decode(&buf)?)),
        _ => Ok(None),
    }
}

pub(crate) fn write_metadata(st: &CheckpointStorage, meta: &Metadata) -> Result<()> {
    st.put_bytes(wire::KEY_METADATA, &meta.encode())
}

fn delete_metadata(st: &CheckpointStorage) -> Result<()> {
    st.delete_bytes(wire::KEY_METADATA)
}

pub(crate) fn read_links(st: &CheckpointStorage, id: &BlockId) -> Result<Option<Links>> {
    match st.get_bytes(&wire::links_key(id))? {
        Some(buf) => Ok(Some(Links::decode(&buf)?)),
        None => Ok(None),
    }
}

fn write_links(st: &CheckpointStorage, id: &BlockId, links: &Links) -> Result<()> {
    st.put_bytes(&wire::links_key(id), &links.encode())
}

/// Newest checkpoint in the store, if any.
pub(crate) fn tip(st: &CheckpointStorage) -> Result<Option<BlockId>> {
    Ok(read_metadata(st)?.map(|meta| meta.newest))
}

/// Commit one save job: figure out the previous tip and append `id`.
pub(crate) fn save_checkpoint(
    st: &CheckpointStorage,
    id: &BlockId,
    contents: &[u8],
    ctx: &CheckpointContext,
) -> Result<()> {
    let prev_newest = match read_metadata(st)? {
        Some(meta) => meta.newest,
        None => *id, // empty store: the new checkpoint self-links
    };
    write_checkpoint(st, id, &prev_newest, contents, &ctx.manifest(), ctx.values(), ctx.machines())
}

/// Insert `id` at the tip.
///
/// Callers pass `prev_newest = id` on an empty store, otherwise the current
/// `metadata.newest` with `prev_newest.height < id.height`. Write order
/// matters: subobjects first, then the record triple (with a self-linked
/// `next`), then the previous tip's `next` pointer, metadata last. A crash
/// between any two steps leaves a store the reconciler and GC tolerate.
pub(crate) fn write_checkpoint(
    st: &CheckpointStorage,
    id: &BlockId,
    prev_newest: &BlockId,
    contents: &[u8],
    manifest: &Manifest,
    values: &[Value],
    machines: &[Machine],
) -> Result<()> {
    for value in values {
        st.put_value(value)?;
    }
    for machine in machines {
        machine.checkpoint(st)?;
    }

    st.put_bytes(&wire::manifest_key(id), &manifest.encode())?;
    st.put_bytes(&wire::contents_key(id), contents)?;
    write_links(st, id, &Links { prev: *prev_newest, next: *id })?;

    if prev_newest != id {
        if let Some(mut links) = read_links(st, prev_newest)? {
            links.next = *id;
            write_links(st, prev_newest, &links)?;
        }
    }

    let meta = match read_metadata(st)? {
        Some(mut meta) => {
            meta.newest = *id;
            meta
        }
        None => Metadata::new(*id, *id),
    };
    write_metadata(st, &meta)
}

/// Contents and a hash resolver for the checkpoint at `id`, when its height
/// falls inside the stored range.
///
/// The range check compares heights alone; two checkpoints saved at the
/// same height are indistinguishable here.
pub(crate) fn restore<'a>(
    st: &'a CheckpointStorage,
    id: &BlockId,
) -> Result<Option<(Vec<u8>, RestoreContext<'a>)>> {
    let Some(meta) = read_metadata(st)? else {
        return Ok(None);
    };
    if id.height < meta.oldest.height || id.height > meta.newest.height {
        return Ok(None);
    }
    let Some(contents) = st.get_bytes(&wire::contents_key(id))? else {
        return Ok(None);
    };
    Ok(Some((contents, RestoreContext::new(st))))
}

/// Unlink the newest checkpoint and enqueue it for deletion. Returns the
/// removed id, or `None` when the store is already empty.
///
/// Never follows `next`: the departing tip has none (it self-links). When
/// the sole remaining record goes, metadata goes with it.
pub(crate) fn truncate_tip(st: &CheckpointStorage) -> Result<Option<BlockId>> {
    let Some(mut meta) = read_metadata(st)? else {
        return Ok(None);
    };
    let removed = meta.newest;
    if meta.newest == meta.oldest {
        delete_metadata(st)?;
    } else {
        let links = read_links(st, &removed)?.ok_or(crate::error::StoreError::NotFound)?;
        meta.newest = links.prev;
        write_metadata(st, &meta)?;
    }
    gc::enqueue(st, &removed);
    Ok(Some(removed))
}

/// Drop checkpoints off the head while the successor of the oldest is still
/// at or below `earliest_kept_height`, so everything under the horizon goes
/// and the first record at or above it becomes the new head. Metadata is
/// persisted on every iteration, so an interrupted trim resumes cleanly.
///
/// Best-effort: stops quietly when the predicate fails, when one record
/// remains, or on any decode failure.
pub(crate) fn trim_head_until(st: &CheckpointStorage, earliest_kept_height: u64) {
    loop {
        let meta = match read_metadata(st) {
            Ok(Some(meta)) => meta,
            Ok(None) => return,
            Err(e) => {
                log::warn!("trim: metadata unreadable, stopping: {e}");
                return;
            }
        };
        if meta.oldest == meta.newest {
            return;
        }
        let links = match read_links(st, &meta.oldest) {
            Ok(Some(links)) => links,
            Ok(None) => return,
            Err(e) => {
                log::warn!("trim: links unreadable at height {}, stopping: {e}", meta.oldest.height);
                return;
            }
        };
        if links.next.height > earliest_kept_height {
            return;
        }

        let removed = meta.oldest;
        let mut meta = meta;
        meta.oldest = links.next;
        if let Err(e) = write_metadata(st, &meta) {
            log::warn!("trim: failed to persist metadata, stopping: {e}");
            return;
        }
        gc::enqueue(st, &removed);
    }
}
