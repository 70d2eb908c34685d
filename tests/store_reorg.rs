//! Reorg behavior through the public facade.

use std::sync::Mutex;

use rollup_checkpoint::{CheckpointContext, StoreError, Value};

mod support;
use support::{id, save_and_wait, temp_store, wait_until, MapChain};

#[tokio::test]
async fn reorged_tip_falls_back_to_the_canonical_block() {
    let (store, _dir) = temp_store();
    let a = id(10, 0xaa);
    let b = id(11, 0xbb);
    let c = id(12, 0xcc);
    for block in [a, b, c] {
        let contents = format!("state-at-{}", block.height);
        save_and_wait(&store, block, contents.as_bytes(), CheckpointContext::new()).await;
    }

    // the chain kept 10 and 11 but a different block won at height 12
    let chain = MapChain::new(&[a, b, id(12, 0x2f)]);

    let seen = Mutex::new(Vec::new());
    store
        .restore_latest(&chain, |contents, _ctx| {
            seen.lock().unwrap().extend_from_slice(contents);
            Ok(())
        })
        .expect("restore after reorg");
    assert_eq!(seen.into_inner().unwrap(), b"state-at-11");
    assert_eq!(store.tip().expect("tip"), Some(b));

    // reconciliation is idempotent: a second restore sees the same tip
    store
        .restore_latest(&chain, |contents, _ctx| {
            assert_eq!(contents, b"state-at-11");
            Ok(())
        })
        .expect("second restore");

    store.close().await;
}

#[tokio::test]
async fn full_reorg_empties_the_store_and_gc_reclaims_it() {
    let (store, _dir) = temp_store();
    let block = id(10, 0xaa);

    let mut ctx = CheckpointContext::new();
    let vhash = ctx.add_value(Value::from_bytes(b"doomed".to_vec()));
    save_and_wait(&store, block, b"x", ctx).await;

    // the chain disowns the only block we ever saw
    let chain = MapChain::new(&[id(10, 0x2f)]);
    let err = store
        .restore_latest(&chain, |_contents, _ctx| Ok(()))
        .expect_err("store reorged to empty");
    assert!(matches!(err, StoreError::NotFound));
    assert!(!store.has_state());

    // the writer's background GC eventually reclaims the orphaned value
    wait_until("orphaned value to be reclaimed", || store.get_value(&vhash).is_none()).await;

    store.close().await;
}

#[tokio::test]
async fn chain_outage_leaves_the_store_untouched() {
    let (store, _dir) = temp_store();
    let a = id(10, 0xaa);
    let b = id(11, 0xbb);
    for block in [a, b] {
        save_and_wait(&store, block, b"x", CheckpointContext::new()).await;
    }

    // MapChain with no entries answers every lookup with an error
    let down = MapChain::new(&[]);
    store
        .restore_latest(&down, |_contents, _ctx| Ok(()))
        .expect("reconciliation aborts quietly, restore still serves the tip");
    assert_eq!(store.tip().expect("tip"), Some(b));

    store.close().await;
}
