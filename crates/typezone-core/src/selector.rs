//! Keyed bucket selection.
//!
//! Maps a type to a bucket index within its size class: a keyed one-way
//! digest over the type's name, size, and alignment, keyed by the
//! per-process seed, reduced modulo the class's bucket count. Identical
//! inputs always produce the identical index within one run; across seeds
//! the mapping behaves like an unbiased pseudo-random choice. The whole
//! path is allocation-free, so it is safe to run under the registry lock.

use crate::seed::SeedMaterial;
use crate::type_desc::TypeDescriptor;

/// Selects the bucket index for `desc` in a class of `bucket_count` buckets.
///
/// `bucket_count` must be non-zero.
#[must_use]
pub fn bucket_index(seed: &SeedMaterial, desc: &TypeDescriptor, bucket_count: u32) -> u32 {
    debug_assert!(bucket_count > 0, "size class with zero buckets");

    let mut hasher = blake3::Hasher::new_keyed(seed.as_key());
    hasher.update(desc.name.as_bytes());
    hasher.update(&desc.size.to_le_bytes());
    hasher.update(&desc.align.to_le_bytes());
    let digest = hasher.finalize();

    // Tail word of the digest, reduced into the bucket range.
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest.as_bytes()[24..32]);
    (u64::from_le_bytes(word) % u64::from(bucket_count)) as u32
}
