//! Flood-control capability: a sliding-window event limiter.
//!
//! The trait mirrors the two-call shape the orchestrator needs: check
//! whether an event may happen, then register that it did. Identity
//! scoping lives in the event key; the limiter itself is key-agnostic.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

/// Maximum number of distinct event keys tracked simultaneously.
///
/// Least-recently-used keys are evicted, which at worst forgets old
/// counters and lets a caller through early, never the other way around.
const MAX_TRACKED_EVENTS: usize = 1000;

/// Sliding-window flood control.
#[async_trait]
pub trait FloodControl: Send + Sync {
    /// True when fewer than `max_events` registrations for `event_key`
    /// are live within the window.
    async fn is_allowed(&self, event_key: &str, max_events: u32, window_secs: u64) -> bool;

    /// Record one occurrence of `event_key`, expiring after `window_secs`.
    async fn register(&self, event_key: &str, window_secs: u64);
}

/// In-memory sliding-window limiter with LRU-bounded key tracking.
pub struct MemoryFlood {
    // Per key: expiry instants of registered events, pruned lazily.
    events: Mutex<LruCache<String, Vec<Instant>>>,
}

impl MemoryFlood {
    #[must_use]
    pub fn new() -> Self {
        let capacity =
            NonZeroUsize::new(MAX_TRACKED_EVENTS).expect("tracked-event capacity is non-zero");
        Self {
            events: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl Default for MemoryFlood {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FloodControl for MemoryFlood {
    // Expiry is fixed when an event is registered, so the window argument
    // is not consulted again here.
    async fn is_allowed(&self, event_key: &str, max_events: u32, _window_secs: u64) -> bool {
        let now = Instant::now();
        let mut events = self.events.lock().await;
        match events.get_mut(event_key) {
            Some(expiries) => {
                expiries.retain(|expiry| *expiry > now);
                (expiries.len() as u32) < max_events
            }
            None => max_events > 0,
        }
    }

    async fn register(&self, event_key: &str, window_secs: u64) {
        let expiry = Instant::now() + Duration::from_secs(window_secs);
        let mut events = self.events.lock().await;
        match events.get_mut(event_key) {
            Some(expiries) => expiries.push(expiry),
            None => {
                events.put(event_key.to_string(), vec![expiry]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_under_limit() {
        let flood = MemoryFlood::new();
        assert!(flood.is_allowed("e", 2, 60).await);
        flood.register("e", 60).await;
        assert!(flood.is_allowed("e", 2, 60).await);
    }

    #[tokio::test]
    async fn denies_at_limit() {
        let flood = MemoryFlood::new();
        flood.register("e", 60).await;
        flood.register("e", 60).await;
        assert!(!flood.is_allowed("e", 2, 60).await);
    }

    #[tokio::test]
    async fn expired_events_free_the_window() {
        let flood = MemoryFlood::new();
        flood.register("e", 0).await;
        flood.register("e", 0).await;
        // Zero-second window: both events are already expired.
        assert!(flood.is_allowed("e", 2, 0).await);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let flood = MemoryFlood::new();
        flood.register("a", 60).await;
        flood.register("a", 60).await;
        assert!(!flood.is_allowed("a", 2, 60).await);
        assert!(flood.is_allowed("b", 2, 60).await);
    }
}
