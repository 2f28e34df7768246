//! Type descriptors and size-class keys.
//!
//! A `TypeDescriptor` is what callers hand us: the type's process-stable
//! name plus its allocation size and alignment. A `SizeAndAlign` is the
//! derived size-class key; every type with the same `(size, align)` pair
//! lands in the same class and competes for the same bucket set.

/// Identifies one size class: all types sharing this `(size, align)` pair.
///
/// Immutable once created. Equality and hashing cover both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SizeAndAlign {
    size: u32,
    align: u32,
}

impl SizeAndAlign {
    /// Creates a size-class key from an allocation size and alignment.
    #[must_use]
    pub const fn new(size: u32, align: u32) -> Self {
        Self { size, align }
    }

    /// Allocation size in bytes.
    #[must_use]
    pub const fn size(self) -> u32 {
        self.size
    }

    /// Allocation alignment in bytes.
    #[must_use]
    pub const fn align(self) -> u32 {
        self.align
    }
}

/// Descriptor of a registered type: name, size, and alignment.
///
/// The name must live for the whole process (string literals, or leaked
/// strings in tooling); it is used only as hashing input and diagnostics,
/// never parsed for content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Process-stable type name.
    pub name: &'static str,
    /// Allocation size in bytes.
    pub size: u32,
    /// Allocation alignment in bytes.
    pub align: u32,
}

impl TypeDescriptor {
    /// Creates a descriptor from explicit layout values.
    #[must_use]
    pub const fn new(name: &'static str, size: u32, align: u32) -> Self {
        Self { name, size, align }
    }

    /// Builds a descriptor for a Rust type from its compile-time layout.
    #[must_use]
    pub fn of<T>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            size: std::mem::size_of::<T>() as u32,
            align: std::mem::align_of::<T>() as u32,
        }
    }

    /// The size-class key this descriptor resolves into.
    #[must_use]
    pub const fn size_and_align(&self) -> SizeAndAlign {
        SizeAndAlign::new(self.size, self.align)
    }

    /// Same descriptor with `size` substituted, for variable-size lookups
    /// where the observed allocation footprint differs from the static size.
    #[must_use]
    pub const fn with_size(self, size: u32) -> Self {
        Self { size, ..self }
    }
}
