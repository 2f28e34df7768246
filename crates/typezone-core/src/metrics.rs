//! Atomic counters for manager observability.
//!
//! All counters use relaxed ordering — they are advisory/diagnostic,
//! not synchronization primitives.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Global zone-manager operation counters.
#[derive(Debug)]
pub struct ZoneMetrics {
    /// Fixed-size heap reference lookups.
    pub lookups: AtomicU64,
    /// Variable-size heap reference lookups.
    pub variable_lookups: AtomicU64,
    /// Variable-size lookups resolved from the cache.
    pub variable_cache_hits: AtomicU64,
    /// Size classes created (one bucket set each).
    pub size_classes_created: AtomicU64,
    /// Seedings that fell back to the fixed public seed.
    pub seed_fallbacks: AtomicU64,
}

impl ZoneMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lookups: AtomicU64::new(0),
            variable_lookups: AtomicU64::new(0),
            variable_cache_hits: AtomicU64::new(0),
            size_classes_created: AtomicU64::new(0),
            seed_fallbacks: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    #[must_use]
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Snapshot all counters into a serializable summary.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lookups: Self::get(&self.lookups),
            variable_lookups: Self::get(&self.variable_lookups),
            variable_cache_hits: Self::get(&self.variable_cache_hits),
            size_classes_created: Self::get(&self.size_classes_created),
            seed_fallbacks: Self::get(&self.seed_fallbacks),
        }
    }
}

impl Default for ZoneMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub lookups: u64,
    pub variable_lookups: u64,
    pub variable_cache_hits: u64,
    pub size_classes_created: u64,
    pub seed_fallbacks: u64,
}
