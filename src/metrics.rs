//! Process-wide request counters.
//!
//! One [`Registry`] is constructed at startup and shared by `Arc` with the
//! metrics and panics middleware and the debug surface. Counters only ever
//! go up; increments are single relaxed atomic adds, so no request ever
//! waits on another to record its outcome.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// The set of counters the service gathers.
#[derive(Debug, Default)]
pub struct Registry {
    workers: AtomicU64,
    requests: AtomicU64,
    errors: AtomicU64,
    panics: AtomicU64,
}

/// A point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub workers: u64,
    pub requests: u64,
    pub errors: u64,
    pub panics: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One per request handled: each request runs on its own execution unit.
    pub fn add_workers(&self) {
        self.workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_panics(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter without blocking writers. The four loads are
    /// independent, so a snapshot taken under load may mix neighbouring
    /// moments.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            workers: self.workers.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }
}
