//! External allocator backend interface.
//!
//! The manager never allocates user memory itself. It consumes exactly one
//! capability from the backing allocator: create an isolated heap for a
//! given `(size, align, name)` and hand back an opaque reference. Callers
//! of the manager receive those references and feed them to the allocator;
//! they never own the heap.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::name::BucketName;

/// Opaque reference to one isolated heap in the backing allocator.
///
/// Stable for the process lifetime. Comparable and hashable so callers
/// can use it as a routing key; the id has no other meaning here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapRef(u64);

impl HeapRef {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Backend-assigned heap id.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// The capability consumed from the external allocator subsystem.
///
/// Heap creation failure at this layer means resource exhaustion;
/// implementations abort rather than surface a recoverable error,
/// consistent with the host out-of-memory policy.
pub trait HeapBackend: Send + Sync {
    /// Creates an isolated heap for objects of `size`/`align`, tagged with
    /// the diagnostic `name`, and returns its opaque reference.
    fn create_heap(&self, size: u32, align: u32, name: BucketName) -> HeapRef;

    /// Number of heaps created so far. Diagnostics only.
    fn heaps_created(&self) -> u64;
}

/// In-process backend that mints logical heap handles without touching
/// real memory. Used by tests and the harness; a production integration
/// would adapt the real allocator behind [`HeapBackend`] instead.
#[derive(Debug)]
pub struct LogicalBackend {
    next_id: AtomicU64,
}

impl LogicalBackend {
    /// Creates a backend with no heaps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for LogicalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapBackend for LogicalBackend {
    fn create_heap(&self, _size: u32, _align: u32, _name: BucketName) -> HeapRef {
        HeapRef::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn heaps_created(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) - 1
    }
}
