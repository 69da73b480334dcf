// Generation tokens for discarding superseded async results.
//
// Each logical resource owns a counter. Starting a fetch advances the
// counter and hands the fetch a token; when the fetch completes it commits
// only if no newer generation has been issued since. Teardown bumps the
// counter without issuing a token, orphaning everything in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared, monotonically increasing generation counter for one resource.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, invalidating every earlier token.
    pub fn advance(&self) -> Generation {
        let value = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        Generation {
            value,
            counter: Arc::clone(&self.current),
        }
    }

    /// Invalidate every outstanding token without starting a new fetch.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// True while another clone or an outstanding token shares this
    /// counter.
    pub fn in_use(&self) -> bool {
        Arc::strong_count(&self.current) > 1
    }
}

/// Token held by one in-flight operation.
#[derive(Debug, Clone)]
pub struct Generation {
    value: u64,
    counter: Arc<AtomicU64>,
}

impl Generation {
    pub fn value(&self) -> u64 {
        self.value
    }

    /// True while no newer generation has been started or the resource
    /// has not been torn down.
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_generation_supersedes_older() {
        let counter = GenerationCounter::new();
        let first = counter.advance();
        assert!(first.is_current());

        let second = counter.advance();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.value() > first.value());
    }

    #[test]
    fn invalidate_orphans_outstanding_tokens() {
        let counter = GenerationCounter::new();
        let token = counter.advance();
        counter.invalidate();
        assert!(!token.is_current());
    }

    #[test]
    fn clones_share_the_same_counter() {
        let counter = GenerationCounter::new();
        let view = counter.clone();
        let token = counter.advance();
        view.advance();
        assert!(!token.is_current());
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn in_use_tracks_clones_and_tokens() {
        let counter = GenerationCounter::new();
        assert!(!counter.in_use());

        let token = counter.advance();
        assert!(counter.in_use());
        drop(token);
        assert!(!counter.in_use());

        let view = counter.clone();
        assert!(counter.in_use());
        drop(view);
        assert!(!counter.in_use());
    }
}
