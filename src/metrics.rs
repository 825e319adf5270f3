//! Lightweight global metrics for the merge engine.
//!
//! Потокобезопасные атомарные счётчики:
//! - merges (ok / failed / empty delta)
//! - rows inserted
//! - retirement (renamed / rename warnings)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Merges -----
static MERGES_OK: AtomicU64 = AtomicU64::new(0);
static MERGES_FAILED: AtomicU64 = AtomicU64::new(0);
static MERGES_EMPTY: AtomicU64 = AtomicU64::new(0);
static ROWS_INSERTED: AtomicU64 = AtomicU64::new(0);

// ----- Retirement -----
static SNAPSHOTS_RETIRED: AtomicU64 = AtomicU64::new(0);
static RENAME_WARNINGS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub merges_ok: u64,
    pub merges_failed: u64,
    pub merges_empty: u64,
    pub rows_inserted: u64,
    pub snapshots_retired: u64,
    pub rename_warnings: u64,
}

impl MetricsSnapshot {
    pub fn avg_rows_per_merge(&self) -> f64 {
        if self.merges_ok == 0 {
            0.0
        } else {
            self.rows_inserted as f64 / self.merges_ok as f64
        }
    }
}

// ----- Recorders -----
pub fn record_merge_ok(rows: u64) {
    MERGES_OK.fetch_add(1, Ordering::Relaxed);
    ROWS_INSERTED.fetch_add(rows, Ordering::Relaxed);
    if rows == 0 {
        MERGES_EMPTY.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_merge_failed() {
    MERGES_FAILED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_snapshot_retired() {
    SNAPSHOTS_RETIRED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_rename_warning() {
    RENAME_WARNINGS.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        merges_ok: MERGES_OK.load(Ordering::Relaxed),
        merges_failed: MERGES_FAILED.load(Ordering::Relaxed),
        merges_empty: MERGES_EMPTY.load(Ordering::Relaxed),
        rows_inserted: ROWS_INSERTED.load(Ordering::Relaxed),
        snapshots_retired: SNAPSHOTS_RETIRED.load(Ordering::Relaxed),
        rename_warnings: RENAME_WARNINGS.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    MERGES_OK.store(0, Ordering::Relaxed);
    MERGES_FAILED.store(0, Ordering::Relaxed);
    MERGES_EMPTY.store(0, Ordering::Relaxed);
    ROWS_INSERTED.store(0, Ordering::Relaxed);
    SNAPSHOTS_RETIRED.store(0, Ordering::Relaxed);
    RENAME_WARNINGS.store(0, Ordering::Relaxed);
}
