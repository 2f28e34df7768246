//! # typezone-core
//!
//! Type-segregated heap bucketing: deterministically but unpredictably
//! assigns each registered type to one of several isolated heaps
//! ("buckets") within its `(size, alignment)` size class, keyed by a
//! per-process secret seed. Two distinct types of the same allocation
//! size are statistically unlikely to share a backing heap, which raises
//! the cost of type-confusion exploitation.
//!
//! The crate manages placement only: it consumes a heap-creation
//! capability from an external allocator ([`HeapBackend`]) and hands
//! opaque references back to callers. It never allocates user memory and
//! never frees anything.
//!
//! # Lifecycle
//!
//! ```
//! use typezone_core::{BucketPolicy, LogicalBackend, TypeDescriptor, ZoneHeapManager};
//!
//! let manager = ZoneHeapManager::new(Box::new(LogicalBackend::new()));
//! manager.set_bucket_policy(BucketPolicy {
//!     small_buckets: 4,
//!     large_buckets: 1,
//!     small_size_limit: 256,
//! });
//! manager.ensure_initialized();
//!
//! let desc = TypeDescriptor::new("Foo", 32, 8);
//! let heap = manager.heap_ref_for_type(&desc);
//! assert_eq!(manager.heap_ref_for_type(&desc), heap);
//! ```

#![deny(unsafe_code)]

pub mod backend;
pub mod manager;
pub mod metrics;
pub mod name;
pub mod policy;
pub mod registry;
pub mod seed;
pub mod selector;
pub mod type_desc;

pub use backend::{HeapBackend, HeapRef, LogicalBackend};
pub use manager::{
    ManagerState, ZoneHeapManager, configure, ensure_initialized, heap_ref_for_type,
    heap_ref_for_variable_size_type, is_ready,
};
pub use metrics::{MetricsSnapshot, ZoneMetrics};
pub use name::{BUCKET_NAME_LEN, BucketName};
pub use policy::{BUCKET_CONFIG_ENV, BucketPolicy, PolicyParseError};
pub use registry::{SizeClassRegistry, SizeClassSnapshot};
pub use seed::{BootTimeEntropy, EntropySource, NoEntropy, SEED_LEN, SeedMaterial, SeedOrigin};
pub use type_desc::{SizeAndAlign, TypeDescriptor};
