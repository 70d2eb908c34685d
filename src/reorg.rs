//! Reorg reconciliation: walk the stored tip backward until it matches the
//! canonical chain.
//!
//! Runs at startup and before every restore. The whole pass is
//! opportunistic -- a chain-client failure or an undecodable record aborts
//! it quietly, the store is left as-is, and the next invocation resumes
//! from whatever metadata was last persisted. Orphaned tips are only
//! unlinked and queued; physical deletion belongs to GC.

use crate::chain::ChainClient;
use crate::index;
use crate::storage::CheckpointStorage;

pub(crate) fn reconcile(st: &CheckpointStorage, client: &dyn ChainClient) {
    let Ok(Some(mut meta)) = index::read_metadata(st) else {
        return;
    };

    while meta.oldest.height < meta.newest.height {
        let tip = meta.newest;
        let canonical = match client.block_id_at(tip.height) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("reorg: {e}; aborting reconciliation at height {}", tip.height);
                return;
            }
        };
        if canonical.header_hash == tip.header_hash {
            return; // canonical tip found
        }

        log::warn!("reorg: unlinking orphaned tip at height {}", tip.height);
        match index::truncate_tip(st) {
            Ok(Some(_)) => crate::metrics::observe_reorg_unlinked(),
            _ => return,
        }
        meta = match index::read_metadata(st) {
            Ok(Some(meta)) => meta,
            _ => return,
        };
    }

    // exactly one record remains; it goes too if the chain disowns it
    let tip = meta.newest;
    let canonical = match client.block_id_at(tip.height) {
        Ok(id) => id,
        Err(_) => return,
    };
    if canonical.header_hash != tip.header_hash {
        log::warn!("reorg: sole checkpoint at height {} is orphaned, emptying store", tip.height);
        if let Ok(Some(_)) = index::truncate_tip(st) {
            crate::metrics::observe_reorg_unlinked();
        }
    }
}
