// src/metrics.rs

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};

pub static SAVES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("ckpt_saves_total", "Checkpoint save jobs processed").unwrap()
});

pub static SAVE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "ckpt_save_duration_seconds",
        "Time to commit one checkpoint save job"
    )
    .unwrap()
});

pub static GC_RECLAIMED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ckpt_gc_reclaimed_total",
        "Checkpoints physically deleted by GC"
    )
    .unwrap()
});

pub static REORG_UNLINKED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ckpt_reorg_unlinked_total",
        "Orphaned tips unlinked by reorg reconciliation"
    )
    .unwrap()
});

pub static DEAD_QUEUE_LEN: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("ckpt_dead_queue_len", "Block ids awaiting GC").unwrap()
});

/// Observe one processed save job (count + duration).
pub fn observe_save(dur_secs: f64) {
    SAVES_TOTAL.inc();
    SAVE_DURATION.observe(dur_secs);
}

pub fn observe_gc_reclaimed(n: u64) {
    if n > 0 {
        GC_RECLAIMED_TOTAL.inc_by(n);
    }
}

pub fn observe_reorg_unlinked() {
    REORG_UNLINKED_TOTAL.inc();
}

pub fn observe_dead_queue_len(len: i64) {
    DEAD_QUEUE_LEN.set(len);
}
