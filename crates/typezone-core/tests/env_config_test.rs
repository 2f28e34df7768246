//! Env-driven bucket configuration. Kept in its own integration binary so
//! mutating the process environment cannot race parallel tests.

#![allow(unsafe_code)]

use typezone_core::{
    BUCKET_CONFIG_ENV, LogicalBackend, NoEntropy, SizeAndAlign, TypeDescriptor, ZoneHeapManager,
};

#[test]
fn env_triple_overrides_bucket_counts_at_seeding() {
    // Environment mutation is unsafe in edition 2024; this binary runs a
    // single test, so no other thread can be reading the environment.
    unsafe { std::env::set_var(BUCKET_CONFIG_ENV, "2:1:128") };

    let manager = ZoneHeapManager::new(Box::new(LogicalBackend::new()));
    manager.ensure_initialized_with(&NoEntropy);

    manager.heap_ref_for_type(&TypeDescriptor::new("EnvSmall", 64, 8));
    manager.heap_ref_for_type(&TypeDescriptor::new("EnvLarge", 256, 8));

    // 64 <= 128 is small under the env policy, 256 is large.
    assert_eq!(manager.bucket_count_of(SizeAndAlign::new(64, 8)), Some(2));
    assert_eq!(manager.bucket_count_of(SizeAndAlign::new(256, 8)), Some(1));
}
