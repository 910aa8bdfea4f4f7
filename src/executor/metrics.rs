//! Execution metrics.
//!
//! An explicit value threaded through the executor and readable from the
//! result stream; deliberately not process-wide state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time totals for one query execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionMetrics {
    /// SQL statements executed (constant statements included).
    pub statements: u64,
    /// Rows fetched from cursors.
    pub rows: u64,
    /// Results delivered to the consumer.
    pub delivered: u64,
    /// Decoded results suppressed as duplicates.
    pub duplicates: u64,
}

#[derive(Debug, Default)]
struct Counters {
    statements: AtomicU64,
    rows: AtomicU64,
    delivered: AtomicU64,
    duplicates: AtomicU64,
}

/// Shared handle: the worker bumps counters, the consumer snapshots them.
#[derive(Debug, Clone, Default)]
pub struct MetricsHandle {
    counters: Arc<Counters>,
}

impl MetricsHandle {
    pub fn new() -> Self {
        MetricsHandle::default()
    }

    pub(crate) fn add_statement(&self) {
        self.counters.statements.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_row(&self) {
        self.counters.rows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_delivered(&self) {
        self.counters.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_duplicate(&self) {
        self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ExecutionMetrics {
        ExecutionMetrics {
            statements: self.counters.statements.load(Ordering::Relaxed),
            rows: self.counters.rows.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            duplicates: self.counters.duplicates.load(Ordering::Relaxed),
        }
    }
}
