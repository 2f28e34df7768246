//! Zone heap manager lifecycle and entry points.
//!
//! The manager owns the seed, the size-class registry, and the
//! variable-size cache for the process lifetime. Its state machine only
//! moves forward: Uninitialized → Seeded (single-flight seeding) →
//! TypesRegistered (first bucket set created). Requesting a heap
//! reference before seeding, or reconfiguring the bucket policy after
//! it, is a programming error and panics.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::{Mutex, Once};

use crate::backend::{HeapBackend, HeapRef, LogicalBackend};
use crate::metrics::ZoneMetrics;
use crate::policy::{BUCKET_CONFIG_ENV, BucketPolicy};
use crate::registry::{SizeClassRegistry, SizeClassSnapshot};
use crate::seed::{BootTimeEntropy, EntropySource, SeedMaterial, SeedOrigin};
use crate::type_desc::{SizeAndAlign, TypeDescriptor};

const STATE_UNINITIALIZED: u8 = 0;
const STATE_SEEDED: u8 = 1;
const STATE_TYPES_REGISTERED: u8 = 2;

/// Lifecycle state, monotonically increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ManagerState {
    /// Constructed; policy may still change, no heap references yet.
    Uninitialized,
    /// Seed derived and policy frozen; heap references may be requested.
    Seeded,
    /// At least one size class exists.
    TypesRegistered,
}

fn state_from_u8(raw: u8) -> ManagerState {
    match raw {
        STATE_TYPES_REGISTERED => ManagerState::TypesRegistered,
        STATE_SEEDED => ManagerState::Seeded,
        _ => ManagerState::Uninitialized,
    }
}

/// Type-segregated heap-bucketing manager.
///
/// One instance normally serves the whole process via
/// [`ZoneHeapManager::global`]; tests and tooling construct their own with
/// an injected backend and entropy source.
pub struct ZoneHeapManager {
    state: AtomicU8,
    seed_once: Once,
    seed: OnceLock<SeedMaterial>,
    /// Pending policy, mutable until seeding freezes it.
    pending_policy: Mutex<BucketPolicy>,
    /// Policy in effect from Seeded onwards.
    effective_policy: OnceLock<BucketPolicy>,
    registry: SizeClassRegistry,
    /// `(type identity, observed size)` → resolved bucket. Its lock is
    /// independent of the registry lock and never held across a resolve.
    variable_cache: Mutex<HashMap<(&'static str, u32), HeapRef>>,
    backend: Box<dyn HeapBackend>,
    metrics: ZoneMetrics,
}

impl ZoneHeapManager {
    /// Creates an uninitialized manager over `backend`.
    #[must_use]
    pub fn new(backend: Box<dyn HeapBackend>) -> Self {
        Self {
            state: AtomicU8::new(STATE_UNINITIALIZED),
            seed_once: Once::new(),
            seed: OnceLock::new(),
            pending_policy: Mutex::new(BucketPolicy::default()),
            effective_policy: OnceLock::new(),
            registry: SizeClassRegistry::new(),
            variable_cache: Mutex::new(HashMap::new()),
            backend,
            metrics: ZoneMetrics::new(),
        }
    }

    /// The process-wide manager, constructed lazily and exactly once.
    pub fn global() -> &'static ZoneHeapManager {
        static GLOBAL: OnceLock<ZoneHeapManager> = OnceLock::new();
        GLOBAL.get_or_init(|| ZoneHeapManager::new(Box::new(LogicalBackend::new())))
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ManagerState {
        state_from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the manager has been seeded. Side-effect-free.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) >= STATE_SEEDED
    }

    /// Overrides the non-zero fields of the bucket policy.
    ///
    /// # Panics
    ///
    /// Panics if called after initialization: the policy is frozen once
    /// any caller may have observed it.
    pub fn set_bucket_policy(&self, policy: BucketPolicy) {
        // State is re-checked under the policy lock: seeding publishes
        // Seeded while holding it, so an update racing initialization
        // either lands before the freeze or fails loudly here.
        let mut pending = self.pending_policy.lock();
        assert!(
            self.state() == ManagerState::Uninitialized,
            "bucket policy must be configured before ensure_initialized()"
        );
        *pending = pending.overridden_by(policy);
    }

    /// Seeds the manager from the host entropy source.
    ///
    /// Idempotent and safe to call concurrently: exactly one caller
    /// performs the work, all callers return with the Seeded state
    /// visible.
    pub fn ensure_initialized(&self) {
        self.ensure_initialized_with(&BootTimeEntropy);
    }

    /// Seeds the manager from an explicit entropy source.
    ///
    /// Tests inject sources here to simulate distinct process runs.
    pub fn ensure_initialized_with(&self, source: &dyn EntropySource) {
        self.seed_once.call_once(|| {
            let (seed, origin) = SeedMaterial::derive(source);
            if origin == SeedOrigin::FixedFallback {
                ZoneMetrics::inc(&self.metrics.seed_fallbacks);
                #[cfg(debug_assertions)]
                eprintln!("typezone: no boot entropy available, using fixed fallback seed");
            }
            let _ = self.seed.set(seed);

            // Env merge, policy freeze, and the Seeded transition happen
            // under one policy-lock acquisition, so set_bucket_policy can
            // never pass its state check and then have its update dropped
            // by the freeze.
            let mut pending = self.pending_policy.lock();
            if let Ok(raw) = std::env::var(BUCKET_CONFIG_ENV) {
                if !raw.is_empty() {
                    *pending = pending.merged_from_env(&raw);
                }
            }
            let _ = self.effective_policy.set(*pending);
            self.state.store(STATE_SEEDED, Ordering::Release);
        });
    }

    /// Resolves the heap reference for a fixed-size type.
    ///
    /// Repeated calls for the same descriptor return the same reference
    /// for the life of the process.
    ///
    /// # Panics
    ///
    /// Panics if the manager has not been seeded; that is an integration
    /// bug, not a runtime condition.
    pub fn heap_ref_for_type(&self, desc: &TypeDescriptor) -> HeapRef {
        assert!(
            self.is_ready(),
            "heap reference requested before ensure_initialized()"
        );
        let seed = self
            .seed
            .get()
            .expect("seeded state implies seed material");
        let policy = *self
            .effective_policy
            .get()
            .expect("seeded state implies frozen policy");

        ZoneMetrics::inc(&self.metrics.lookups);
        let (heap_ref, created) =
            self.registry
                .resolve(desc, seed, policy, self.backend.as_ref());
        if created {
            ZoneMetrics::inc(&self.metrics.size_classes_created);
            self.state.fetch_max(STATE_TYPES_REGISTERED, Ordering::AcqRel);
        }
        heap_ref
    }

    /// Resolves the heap reference for a type whose allocation footprint
    /// is only known at runtime (trailing arrays and similar).
    ///
    /// The first call for a given `(identity, observed_size)` resolves
    /// through the primary path with the observed size; later calls hit
    /// the cache and return the identical reference without re-hashing.
    pub fn heap_ref_for_variable_size_type(
        &self,
        desc: &TypeDescriptor,
        observed_size: u32,
    ) -> HeapRef {
        ZoneMetrics::inc(&self.metrics.variable_lookups);
        let key = (desc.name, observed_size);

        if let Some(&heap_ref) = self.variable_cache.lock().get(&key) {
            ZoneMetrics::inc(&self.metrics.variable_cache_hits);
            return heap_ref;
        }

        // Resolve outside the cache lock; the registry lock never nests
        // under it. A racing first lookup lands on the same bucket, so
        // the late insert is idempotent.
        let heap_ref = self.heap_ref_for_type(&desc.with_size(observed_size));
        self.variable_cache.lock().insert(key, heap_ref);
        heap_ref
    }

    /// Operation counters.
    #[must_use]
    pub fn metrics(&self) -> &ZoneMetrics {
        &self.metrics
    }

    /// The backend this manager creates heaps through.
    #[must_use]
    pub fn backend(&self) -> &dyn HeapBackend {
        self.backend.as_ref()
    }

    /// Number of size classes created so far.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.registry.class_count()
    }

    /// Bucket count of an already-created size class.
    #[must_use]
    pub fn bucket_count_of(&self, class: SizeAndAlign) -> Option<u32> {
        self.registry.bucket_count_of(class)
    }

    /// Heap references of an already-created size class, in bucket order.
    #[must_use]
    pub fn heap_refs_of(&self, class: SizeAndAlign) -> Option<Vec<HeapRef>> {
        self.registry.heap_refs_of(class)
    }

    /// Per-class diagnostics, sorted by `(size, align)`.
    #[must_use]
    pub fn size_class_snapshots(&self) -> Vec<SizeClassSnapshot> {
        self.registry.snapshot()
    }

    /// Human-readable report of registered size classes and bucket usage.
    ///
    /// Unstructured text with no compatibility contract. Not for the hot
    /// allocation path.
    #[must_use]
    pub fn dump_registered_types(&self) -> String {
        let snapshots = self.size_class_snapshots();
        let mut report = String::new();

        let _ = writeln!(report, "typezone registered size classes: {}", snapshots.len());
        if snapshots.is_empty() {
            return report;
        }

        let widest = snapshots
            .iter()
            .map(|snap| snap.bucket_count)
            .max()
            .unwrap_or(0);

        let _ = write!(report, "      Size  Align  Bckts  Types  Inuse ");
        for i in 0..widest {
            let _ = write!(report, "  Bkt{i:<2}");
        }
        let _ = writeln!(report);

        let mut histogram: HashMap<u32, u32> = HashMap::new();
        let mut busiest: Option<&SizeClassSnapshot> = None;

        for snap in &snapshots {
            let _ = write!(
                report,
                "    {:>6}  {:>5}  {:>5}  {:>5}  {:>5} ",
                snap.size,
                snap.align,
                snap.bucket_count,
                snap.types_registered,
                snap.used_buckets()
            );
            for count in &snap.use_counts {
                let _ = write!(report, "  {count:>5}");
            }
            let _ = writeln!(report);

            *histogram.entry(snap.bucket_count).or_insert(0) += 1;
            if busiest.is_none_or(|best| snap.types_registered > best.types_registered) {
                busiest = Some(snap);
            }
        }

        let total_types: u64 = snapshots.iter().map(|snap| snap.types_registered).sum();
        let total_used: u32 = snapshots.iter().map(SizeClassSnapshot::used_buckets).sum();
        let _ = writeln!(
            report,
            "    types in use: {total_types}  buckets (heaps) in use: {total_used}"
        );

        let mut histogram: Vec<(u32, u32)> = histogram.into_iter().collect();
        histogram.sort_unstable();
        let _ = write!(report, "    size class bucket histogram:");
        for (bucket_count, classes) in histogram {
            let _ = write!(report, " count {bucket_count}: {classes}");
        }
        let _ = writeln!(report);

        if let Some(snap) = busiest {
            let _ = writeln!(
                report,
                "    most populated size class:  size: {} alignment: {} type count: {}",
                snap.size, snap.align, snap.types_registered
            );
        }

        report
    }
}

/// Configures the process-wide manager's bucket policy. Call once, before
/// any allocation activity.
pub fn configure(policy: BucketPolicy) {
    ZoneHeapManager::global().set_bucket_policy(policy);
}

/// Seeds the process-wide manager. Idempotent.
pub fn ensure_initialized() {
    ZoneHeapManager::global().ensure_initialized();
}

/// Whether the process-wide manager is seeded.
#[must_use]
pub fn is_ready() -> bool {
    ZoneHeapManager::global().is_ready()
}

/// Heap reference for a fixed-size type via the process-wide manager.
#[must_use]
pub fn heap_ref_for_type(desc: &TypeDescriptor) -> HeapRef {
    ZoneHeapManager::global().heap_ref_for_type(desc)
}

/// Heap reference for a variable-size type via the process-wide manager.
#[must_use]
pub fn heap_ref_for_variable_size_type(desc: &TypeDescriptor, observed_size: u32) -> HeapRef {
    ZoneHeapManager::global().heap_ref_for_variable_size_type(desc, observed_size)
}
