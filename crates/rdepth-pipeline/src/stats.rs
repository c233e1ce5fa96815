// rdepth-pipeline/src/stats.rs
// Counters behind the silent-absorption policy: every dropped frame or
// capture leaves a trace here even though no error surfaces.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct PipelineStats {
    frames_in: AtomicU64,
    frames_published: AtomicU64,
    disparity_failures: AtomicU64,
    resample_failures: AtomicU64,
    encode_failures: AtomicU64,
}

impl PipelineStats {
    pub(crate) fn record_frame_in(&self) {
        self.frames_in.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disparity_failure(&self) {
        self.disparity_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_resample_failure(&self) {
        self.resample_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            frames_published: self.frames_published.load(Ordering::Relaxed),
            disparity_failures: self.disparity_failures.load(Ordering::Relaxed),
            resample_failures: self.resample_failures.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters, serializable for logs or IPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames_in: u64,
    pub frames_published: u64,
    pub disparity_failures: u64,
    pub resample_failures: u64,
    pub encode_failures: u64,
}
