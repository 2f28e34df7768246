//! Seed material derivation.
//!
//! The per-process seed keys every bucket-selection hash. It is derived
//! once, at the Uninitialized → Seeded transition, from a best-effort
//! boot-scoped entropy source (boot timestamp plus process name) pushed
//! through SHA-256. The derivation is one-way: the raw inputs are mixed
//! into a 128-byte block and digested, so the seed cannot be read back
//! into its components. Hosts without a boot-time source fall back to a
//! fixed, publicly known seed — a documented degraded-security mode, not
//! an error.

use std::fmt;

use sha2::{Digest, Sha256};

/// Seed length in bytes. Sized to key the bucket-selection hash directly.
pub const SEED_LEN: usize = 32;

/// Length of the raw pre-digest entropy block.
const RAW_SEED_LEN: usize = 128;

/// Fixed public seed used when no boot entropy is available.
const FIXED_FALLBACK_SEED: &[u8] = b"DefaultSeed\x12\x34\x56\x78\x9a\xbc\xde\xf0";

/// How the seed was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOrigin {
    /// Derived from the host boot timestamp and process name.
    BootTime,
    /// Fixed public fallback; bucket placement is predictable across runs.
    FixedFallback,
}

/// Process-run-scoped secret keying the type→bucket hash.
///
/// Never serialized, never printed: the `Debug` impl redacts the bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SeedMaterial([u8; SEED_LEN]);

impl SeedMaterial {
    /// Wraps explicit seed bytes. Intended for harness/test injection;
    /// production seeding goes through [`SeedMaterial::derive`].
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// Derives the seed from `source`, falling back to the fixed public
    /// seed when the source has no boot timestamp.
    #[must_use]
    pub fn derive(source: &dyn EntropySource) -> (Self, SeedOrigin) {
        match source.boot_timestamp_micros() {
            Some(primordial) => {
                let raw = raw_seed_block(primordial, &source.process_name());
                let digest: [u8; SEED_LEN] = Sha256::digest(raw).into();
                (Self(digest), SeedOrigin::BootTime)
            }
            None => {
                let digest: [u8; SEED_LEN] = Sha256::digest(FIXED_FALLBACK_SEED).into();
                (Self(digest), SeedOrigin::FixedFallback)
            }
        }
    }

    /// Raw key bytes for the selection hash. Crate-internal on purpose.
    pub(crate) const fn as_key(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl fmt::Debug for SeedMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeedMaterial(<redacted>)")
    }
}

/// Pluggable source of boot-scoped entropy.
///
/// Two implementations ship: [`BootTimeEntropy`] (host timestamp) and
/// [`NoEntropy`] (forces the fixed fallback). Tests inject their own to
/// simulate distinct process runs.
pub trait EntropySource {
    /// Best-effort boot-scoped timestamp in microseconds, stable for the
    /// life of the host boot. `None` if the host has no such source.
    fn boot_timestamp_micros(&self) -> Option<u64>;

    /// Name of the current process, mixed in to diversify the seed across
    /// processes sharing one boot.
    fn process_name(&self) -> String;
}

/// Entropy from the host boot timestamp (`/proc/stat` `btime` on Linux)
/// and the current executable name.
#[derive(Debug, Default, Clone, Copy)]
pub struct BootTimeEntropy;

impl EntropySource for BootTimeEntropy {
    fn boot_timestamp_micros(&self) -> Option<u64> {
        proc_stat_boot_time_micros()
    }

    fn process_name(&self) -> String {
        std::env::current_exe()
            .ok()
            .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Source with no entropy at all; always yields the fixed fallback seed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEntropy;

impl EntropySource for NoEntropy {
    fn boot_timestamp_micros(&self) -> Option<u64> {
        None
    }

    fn process_name(&self) -> String {
        "fixed".to_string()
    }
}

#[cfg(target_os = "linux")]
fn proc_stat_boot_time_micros() -> Option<u64> {
    let stat = std::fs::read_to_string("/proc/stat").ok()?;
    for line in stat.lines() {
        if let Some(rest) = line.strip_prefix("btime ") {
            return rest.trim().parse::<u64>().ok()?.checked_mul(1_000_000);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn proc_stat_boot_time_micros() -> Option<u64> {
    None
}

/// Expands the primordial timestamp and process name into the fixed-width
/// raw block that gets digested.
///
/// Layout: the timestamp's nibbles mapped into printable bytes, then the
/// process name, then deterministic printable padding to `RAW_SEED_LEN`.
fn raw_seed_block(mut primordial: u64, process_name: &str) -> [u8; RAW_SEED_LEN] {
    let mut raw = [0u8; RAW_SEED_LEN];
    let mut idx = 0;

    while primordial != 0 && idx < RAW_SEED_LEN {
        let digit = (primordial & 0xf) as u8;
        raw[idx] = b'Z' - digit;
        primordial >>= 4;
        idx += 1;
    }

    for &byte in process_name.as_bytes() {
        if idx >= RAW_SEED_LEN {
            break;
        }
        raw[idx] = byte;
        idx += 1;
    }

    while idx < RAW_SEED_LEN {
        raw[idx] = b'Q' - (idx as u8 & 0xf);
        idx += 1;
    }

    raw
}
