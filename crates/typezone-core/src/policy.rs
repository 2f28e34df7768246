//! Bucket-count policy.
//!
//! The policy fixes how many isolated heaps ("buckets") each size class
//! gets: one count for small classes, one for large, split at a size
//! threshold. It can be set programmatically before initialization or via
//! the `TYPEZONE_BUCKET_CONFIG` environment variable as a colon-delimited
//! `<small>:<large>:<limit>` triple. The env path is lenient: malformed or
//! missing fields fall back to the compiled-in defaults field by field.
//! Once any bucket set exists the policy is frozen.

use thiserror::Error;

use crate::type_desc::SizeAndAlign;

/// Environment variable consulted once at initialization.
pub const BUCKET_CONFIG_ENV: &str = "TYPEZONE_BUCKET_CONFIG";

/// Default bucket count for small size classes.
pub const DEFAULT_SMALL_BUCKETS: u32 = 4;

/// Default bucket count for large size classes.
pub const DEFAULT_LARGE_BUCKETS: u32 = 1;

/// Default small/large split: classes with `size <= limit` are small.
pub const DEFAULT_SMALL_SIZE_LIMIT: u32 = 512;

/// Per-size-class bucket counts and the small/large threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketPolicy {
    /// Buckets per size class for `size <= small_size_limit`.
    pub small_buckets: u32,
    /// Buckets per size class for `size > small_size_limit`.
    pub large_buckets: u32,
    /// Largest size still considered small.
    pub small_size_limit: u32,
}

impl Default for BucketPolicy {
    fn default() -> Self {
        Self {
            small_buckets: DEFAULT_SMALL_BUCKETS,
            large_buckets: DEFAULT_LARGE_BUCKETS,
            small_size_limit: DEFAULT_SMALL_SIZE_LIMIT,
        }
    }
}

/// Strict-parse failure for `BucketPolicy::parse`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyParseError {
    /// The triple had the wrong number of colon-delimited fields.
    #[error("expected <small>:<large>:<limit>, got {0} field(s)")]
    WrongFieldCount(usize),
    /// A field failed integer parsing.
    #[error("invalid bucket policy number: {0:?}")]
    InvalidNumber(String),
    /// Bucket counts of zero would make selection impossible.
    #[error("bucket counts must be non-zero")]
    ZeroBucketCount,
}

impl BucketPolicy {
    /// Bucket count for a size class under this policy.
    #[must_use]
    pub const fn bucket_count_for(self, class: SizeAndAlign) -> u32 {
        if class.size() > self.small_size_limit {
            self.large_buckets
        } else {
            self.small_buckets
        }
    }

    /// Applies the non-zero fields of `update` over `self`.
    ///
    /// Zero fields of `update` keep the existing value, matching the
    /// configure-before-init contract where zero means "default".
    #[must_use]
    pub fn overridden_by(self, update: BucketPolicy) -> Self {
        let pick = |new: u32, old: u32| if new != 0 { new } else { old };
        Self {
            small_buckets: pick(update.small_buckets, self.small_buckets),
            large_buckets: pick(update.large_buckets, self.large_buckets),
            small_size_limit: pick(update.small_size_limit, self.small_size_limit),
        }
    }

    /// Strictly parses a `<small>:<large>:<limit>` triple.
    ///
    /// Used by tooling surfaces where a malformed value should be reported
    /// rather than silently defaulted.
    pub fn parse(raw: &str) -> Result<Self, PolicyParseError> {
        let fields: Vec<&str> = raw.split(':').collect();
        if fields.len() != 3 {
            return Err(PolicyParseError::WrongFieldCount(fields.len()));
        }
        let mut values = [0u32; 3];
        for (slot, field) in values.iter_mut().zip(&fields) {
            *slot = field
                .trim()
                .parse::<u32>()
                .map_err(|_| PolicyParseError::InvalidNumber((*field).to_string()))?;
        }
        if values[0] == 0 || values[1] == 0 {
            return Err(PolicyParseError::ZeroBucketCount);
        }
        Ok(Self {
            small_buckets: values[0],
            large_buckets: values[1],
            small_size_limit: values[2],
        })
    }

    /// Leniently merges an env-style triple over `self`, field by field.
    ///
    /// One, two, or three fields may be given; a field that is empty,
    /// non-numeric, or zero leaves the corresponding value unchanged.
    #[must_use]
    pub fn merged_from_env(self, raw: &str) -> Self {
        let mut merged = self;
        for (i, field) in raw.split(':').take(3).enumerate() {
            let Ok(value) = field.trim().parse::<u32>() else {
                continue;
            };
            if value == 0 {
                continue;
            }
            match i {
                0 => merged.small_buckets = value,
                1 => merged.large_buckets = value,
                _ => merged.small_size_limit = value,
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = BucketPolicy::default();
        assert_eq!(policy.small_buckets, DEFAULT_SMALL_BUCKETS);
        assert_eq!(policy.large_buckets, DEFAULT_LARGE_BUCKETS);
        assert_eq!(policy.small_size_limit, DEFAULT_SMALL_SIZE_LIMIT);
    }

    #[test]
    fn test_bucket_count_threshold() {
        let policy = BucketPolicy {
            small_buckets: 4,
            large_buckets: 1,
            small_size_limit: 256,
        };
        // The limit itself is still small.
        assert_eq!(policy.bucket_count_for(SizeAndAlign::new(256, 8)), 4);
        assert_eq!(policy.bucket_count_for(SizeAndAlign::new(257, 8)), 1);
        assert_eq!(policy.bucket_count_for(SizeAndAlign::new(16, 8)), 4);
    }

    #[test]
    fn test_overridden_by_keeps_zero_fields() {
        let base = BucketPolicy::default();
        let update = BucketPolicy {
            small_buckets: 8,
            large_buckets: 0,
            small_size_limit: 0,
        };
        let merged = base.overridden_by(update);
        assert_eq!(merged.small_buckets, 8);
        assert_eq!(merged.large_buckets, DEFAULT_LARGE_BUCKETS);
        assert_eq!(merged.small_size_limit, DEFAULT_SMALL_SIZE_LIMIT);
    }

    #[test]
    fn test_parse_strict_ok() {
        let policy = BucketPolicy::parse("4:1:256").unwrap();
        assert_eq!(policy.small_buckets, 4);
        assert_eq!(policy.large_buckets, 1);
        assert_eq!(policy.small_size_limit, 256);
    }

    #[test]
    fn test_parse_strict_rejects_bad_input() {
        assert_eq!(
            BucketPolicy::parse("4:1"),
            Err(PolicyParseError::WrongFieldCount(2))
        );
        assert_eq!(
            BucketPolicy::parse("4:x:256"),
            Err(PolicyParseError::InvalidNumber("x".to_string()))
        );
        assert_eq!(
            BucketPolicy::parse("0:1:256"),
            Err(PolicyParseError::ZeroBucketCount)
        );
    }

    #[test]
    fn test_env_merge_partial() {
        let merged = BucketPolicy::default().merged_from_env("8:2");
        assert_eq!(merged.small_buckets, 8);
        assert_eq!(merged.large_buckets, 2);
        assert_eq!(merged.small_size_limit, DEFAULT_SMALL_SIZE_LIMIT);
    }

    #[test]
    fn test_env_merge_malformed_fields_fall_back() {
        let merged = BucketPolicy::default().merged_from_env("banana:2:0");
        assert_eq!(merged.small_buckets, DEFAULT_SMALL_BUCKETS);
        assert_eq!(merged.large_buckets, 2);
        assert_eq!(merged.small_size_limit, DEFAULT_SMALL_SIZE_LIMIT);
    }

    #[test]
    fn test_env_merge_extra_fields_ignored() {
        let merged = BucketPolicy::default().merged_from_env("2:2:128:999");
        assert_eq!(merged.small_buckets, 2);
        assert_eq!(merged.large_buckets, 2);
        assert_eq!(merged.small_size_limit, 128);
    }
}
