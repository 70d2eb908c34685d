//! No-op stand-ins for the prometheus helpers when the `metrics` feature is
//! off, so call sites stay unconditional.

#[inline]
pub fn observe_save(_dur_secs: f64) {}

#[inline]
pub fn observe_gc_reclaimed(_n: u64) {}

#[inline]
pub fn observe_reorg_unlinked() {}

#[inline]
pub fn observe_dead_queue_len(_len: i64) {}
