//! Pipeline checkpoints for metrics and logging
//!
//! The pipeline reports outcomes through an injected observer instead of
//! ambient global counters, so services and tests choose their own sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub trait PipelineObserver: Send + Sync {
    /// A request produced a final PDF with `pages` pages.
    fn request_completed(&self, pages: u32, elapsed: Duration);

    /// A request failed; `kind` is the stable error kind string.
    fn request_failed(&self, kind: &str);
}

/// No-op sink for callers that do not track metrics.
#[derive(Debug, Default)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {
    fn request_completed(&self, _pages: u32, _elapsed: Duration) {}
    fn request_failed(&self, _kind: &str) {}
}

/// Process-local counters, readable from a stats endpoint.
#[derive(Debug, Default)]
pub struct CountingObserver {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl PipelineObserver for CountingObserver {
    fn request_completed(&self, pages: u32, elapsed: Duration) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "request completed: {} pages in {} ms",
            pages,
            elapsed.as_millis()
        );
    }

    fn request_failed(&self, kind: &str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        log::warn!("request failed: {kind}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_observer_tracks_outcomes() {
        let observer = CountingObserver::new();
        observer.request_completed(4, Duration::from_millis(10));
        observer.request_completed(2, Duration::from_millis(20));
        observer.request_failed("conversion_timeout");

        assert_eq!(observer.completed(), 2);
        assert_eq!(observer.failed(), 1);
    }
}
