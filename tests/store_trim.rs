//! Head trimming and deferred reclamation through the public facade.

use rollup_checkpoint::{CheckpointContext, Value};

mod support;
use support::{id, save_and_wait, temp_store, wait_until, MapChain};

#[tokio::test]
async fn trim_drops_old_heads_and_gc_reclaims_their_values() {
    let (store, _dir) = temp_store();
    let blocks = [id(10, 0xaa), id(11, 0xbb), id(12, 0xcc)];

    let mut value_hashes = Vec::new();
    for block in blocks {
        let mut ctx = CheckpointContext::new();
        let bytes = format!("value-at-{}", block.height).into_bytes();
        value_hashes.push(ctx.add_value(Value::from_bytes(bytes)));
        let contents = format!("state-at-{}", block.height);
        save_and_wait(&store, block, contents.as_bytes(), ctx).await;
    }

    store.trim_before(12);

    // the tip is untouched and still restorable
    assert_eq!(store.tip().expect("tip"), Some(blocks[2]));
    store
        .restore_latest(&MapChain::new(&blocks), |contents, _ctx| {
            assert_eq!(contents, b"state-at-12");
            Ok(())
        })
        .expect("restore tip after trim");

    // heights 10 and 11 drop out of the restorable range immediately
    assert!(store.restore_checkpoint(&blocks[0]).expect("below range").is_none());

    // and their values disappear once background GC catches up
    wait_until("trimmed values to be reclaimed", || {
        store.get_value(&value_hashes[0]).is_none() && store.get_value(&value_hashes[1]).is_none()
    })
    .await;
    assert!(store.get_value(&value_hashes[2]).is_some());

    store.close().await;
}

#[tokio::test]
async fn trim_is_bounded_by_the_sole_remaining_record() {
    let (store, _dir) = temp_store();
    let block = id(10, 0xaa);
    save_and_wait(&store, block, b"x", CheckpointContext::new()).await;

    // even an absurd horizon never removes the last checkpoint
    store.trim_before(u64::MAX);
    assert!(store.has_state());
    assert_eq!(store.tip().expect("tip"), Some(block));

    store.close().await;
}
