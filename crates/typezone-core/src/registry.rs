//! Append-only size-class registry.
//!
//! Maps each `(size, align)` pair to its bucket set, creating the set on
//! first use: one backend heap per bucket, each pre-named by the encoder.
//! Creation is check-then-create under the registry-wide lock, so a size
//! class is created at most once no matter how many threads race on first
//! use. Entries are never removed or resized afterwards; steady-state
//! lookups hold the lock only for the map hit plus the (allocation-free)
//! bucket selection.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

use crate::backend::{HeapBackend, HeapRef};
use crate::name::BucketName;
use crate::policy::BucketPolicy;
use crate::seed::SeedMaterial;
use crate::selector;
use crate::type_desc::{SizeAndAlign, TypeDescriptor};

/// One isolated heap within a size class.
#[derive(Debug)]
pub struct Bucket {
    heap_ref: HeapRef,
    name: BucketName,
    use_count: u64,
}

impl Bucket {
    /// Opaque reference to this bucket's heap.
    #[must_use]
    pub const fn heap_ref(&self) -> HeapRef {
        self.heap_ref
    }

    /// Diagnostic name this bucket's heap was created under.
    #[must_use]
    pub const fn name(&self) -> BucketName {
        self.name
    }

    /// Times this bucket has been selected. Diagnostics only.
    #[must_use]
    pub const fn use_count(&self) -> u64 {
        self.use_count
    }
}

/// The buckets of one size class, created exactly once and never resized.
#[derive(Debug)]
pub struct BucketSet {
    class: SizeAndAlign,
    buckets: Vec<Bucket>,
    types_registered: u64,
}

impl BucketSet {
    fn create(class: SizeAndAlign, bucket_count: u32, backend: &dyn HeapBackend) -> Self {
        let buckets = (0..bucket_count)
            .map(|index| {
                let name = BucketName::encode(class.size(), class.align(), index);
                let heap_ref = backend.create_heap(class.size(), class.align(), name);
                Bucket {
                    heap_ref,
                    name,
                    use_count: 0,
                }
            })
            .collect();
        Self {
            class,
            buckets,
            types_registered: 0,
        }
    }

    /// Number of buckets in this class. Fixed at creation.
    #[must_use]
    pub fn bucket_count(&self) -> u32 {
        self.buckets.len() as u32
    }

    fn note_use(&mut self, index: u32) {
        self.types_registered += 1;
        self.buckets[index as usize].use_count += 1;
    }

    fn snapshot(&self) -> SizeClassSnapshot {
        SizeClassSnapshot {
            size: self.class.size(),
            align: self.class.align(),
            bucket_count: self.bucket_count(),
            types_registered: self.types_registered,
            use_counts: self.buckets.iter().map(Bucket::use_count).collect(),
        }
    }
}

/// Read-only copy of one size class's diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeClassSnapshot {
    pub size: u32,
    pub align: u32,
    pub bucket_count: u32,
    /// Registration calls routed to this class. Diagnostics only.
    pub types_registered: u64,
    /// Per-bucket selection counts.
    pub use_counts: Vec<u64>,
}

impl SizeClassSnapshot {
    /// Buckets of this class that have been selected at least once.
    #[must_use]
    pub fn used_buckets(&self) -> u32 {
        self.use_counts.iter().filter(|&&count| count > 0).count() as u32
    }
}

/// Lazily-populated map from size class to bucket set.
pub struct SizeClassRegistry {
    classes: Mutex<HashMap<SizeAndAlign, BucketSet>>,
}

impl SizeClassRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            classes: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the bucket for `desc`, creating its size class on first use.
    ///
    /// Returns the bucket's heap reference and whether this call created
    /// the class. Bucket selection and diagnostics updates happen under
    /// the same lock acquisition as the map lookup.
    pub fn resolve(
        &self,
        desc: &TypeDescriptor,
        seed: &SeedMaterial,
        policy: BucketPolicy,
        backend: &dyn HeapBackend,
    ) -> (HeapRef, bool) {
        let class = desc.size_and_align();
        let mut classes = self.classes.lock();

        let created = !classes.contains_key(&class);
        let set = classes
            .entry(class)
            .or_insert_with(|| BucketSet::create(class, policy.bucket_count_for(class), backend));

        let index = selector::bucket_index(seed, desc, set.bucket_count());
        set.note_use(index);
        (set.buckets[index as usize].heap_ref, created)
    }

    /// Number of size classes created so far.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.lock().len()
    }

    /// Bucket count of an already-created class, if any.
    #[must_use]
    pub fn bucket_count_of(&self, class: SizeAndAlign) -> Option<u32> {
        self.classes.lock().get(&class).map(BucketSet::bucket_count)
    }

    /// Heap references of an already-created class, in bucket order.
    #[must_use]
    pub fn heap_refs_of(&self, class: SizeAndAlign) -> Option<Vec<HeapRef>> {
        self.classes
            .lock()
            .get(&class)
            .map(|set| set.buckets.iter().map(Bucket::heap_ref).collect())
    }

    /// Snapshots every class, sorted by `(size, align)`.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SizeClassSnapshot> {
        let classes = self.classes.lock();
        let mut snapshots: Vec<SizeClassSnapshot> =
            classes.values().map(BucketSet::snapshot).collect();
        snapshots.sort_by_key(|snap| (snap.size, snap.align));
        snapshots
    }
}

impl Default for SizeClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LogicalBackend;
    use crate::seed::SEED_LEN;

    fn test_seed() -> SeedMaterial {
        SeedMaterial::from_bytes([0x5A; SEED_LEN])
    }

    fn test_policy() -> BucketPolicy {
        BucketPolicy {
            small_buckets: 4,
            large_buckets: 1,
            small_size_limit: 256,
        }
    }

    #[test]
    fn test_class_created_once() {
        let registry = SizeClassRegistry::new();
        let backend = LogicalBackend::new();
        let seed = test_seed();
        let desc = TypeDescriptor::new("Foo", 32, 8);

        let (first, created_first) = registry.resolve(&desc, &seed, test_policy(), &backend);
        let (second, created_second) = registry.resolve(&desc, &seed, test_policy(), &backend);

        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first, second);
        assert_eq!(registry.class_count(), 1);
        assert_eq!(backend.heaps_created(), 4);
    }

    #[test]
    fn test_bucket_counts_follow_policy() {
        let registry = SizeClassRegistry::new();
        let backend = LogicalBackend::new();
        let seed = test_seed();

        registry.resolve(&TypeDescriptor::new("Small", 32, 8), &seed, test_policy(), &backend);
        registry.resolve(&TypeDescriptor::new("Large", 512, 8), &seed, test_policy(), &backend);

        assert_eq!(registry.bucket_count_of(SizeAndAlign::new(32, 8)), Some(4));
        assert_eq!(registry.bucket_count_of(SizeAndAlign::new(512, 8)), Some(1));
        assert_eq!(registry.bucket_count_of(SizeAndAlign::new(64, 8)), None);
    }

    #[test]
    fn test_classes_do_not_share_heaps() {
        let registry = SizeClassRegistry::new();
        let backend = LogicalBackend::new();
        let seed = test_seed();

        registry.resolve(&TypeDescriptor::new("A", 32, 8), &seed, test_policy(), &backend);
        registry.resolve(&TypeDescriptor::new("B", 64, 8), &seed, test_policy(), &backend);
        registry.resolve(&TypeDescriptor::new("C", 32, 16), &seed, test_policy(), &backend);

        let a = registry.heap_refs_of(SizeAndAlign::new(32, 8)).unwrap();
        let b = registry.heap_refs_of(SizeAndAlign::new(64, 8)).unwrap();
        let c = registry.heap_refs_of(SizeAndAlign::new(32, 16)).unwrap();

        for heap_ref in &a {
            assert!(!b.contains(heap_ref));
            assert!(!c.contains(heap_ref));
        }
        for heap_ref in &b {
            assert!(!c.contains(heap_ref));
        }
    }

    #[test]
    fn test_resolved_ref_belongs_to_class() {
        let registry = SizeClassRegistry::new();
        let backend = LogicalBackend::new();
        let seed = test_seed();
        let desc = TypeDescriptor::new("Member", 48, 8);

        let (heap_ref, _) = registry.resolve(&desc, &seed, test_policy(), &backend);
        let class_refs = registry.heap_refs_of(SizeAndAlign::new(48, 8)).unwrap();
        assert!(class_refs.contains(&heap_ref));
    }

    #[test]
    fn test_snapshot_reflects_use_counts() {
        let registry = SizeClassRegistry::new();
        let backend = LogicalBackend::new();
        let seed = test_seed();
        let desc = TypeDescriptor::new("Counted", 32, 8);

        for _ in 0..3 {
            registry.resolve(&desc, &seed, test_policy(), &backend);
        }

        let snapshots = registry.snapshot();
        assert_eq!(snapshots.len(), 1);
        let snap = &snapshots[0];
        assert_eq!(snap.size, 32);
        assert_eq!(snap.align, 8);
        assert_eq!(snap.bucket_count, 4);
        assert_eq!(snap.types_registered, 3);
        assert_eq!(snap.use_counts.iter().sum::<u64>(), 3);
        assert_eq!(snap.used_buckets(), 1);
    }

    #[test]
    fn test_snapshot_sorted_by_size_then_align() {
        let registry = SizeClassRegistry::new();
        let backend = LogicalBackend::new();
        let seed = test_seed();

        registry.resolve(&TypeDescriptor::new("Z", 512, 8), &seed, test_policy(), &backend);
        registry.resolve(&TypeDescriptor::new("Y", 32, 16), &seed, test_policy(), &backend);
        registry.resolve(&TypeDescriptor::new("X", 32, 8), &seed, test_policy(), &backend);

        let keys: Vec<(u32, u32)> = registry
            .snapshot()
            .iter()
            .map(|snap| (snap.size, snap.align))
            .collect();
        assert_eq!(keys, vec![(32, 8), (32, 16), (512, 8)]);
    }
}
