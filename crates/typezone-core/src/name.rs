//! Fixed-width diagnostic bucket names.
//!
//! Every bucket gets a short printable identifier so crash reports and
//! heap inspectors can tell synthetic bucket heaps apart:
//! `ZH_<sss>_<a>_<ii>` where `sss` is a 3-character base64 encoding of the
//! size, `a` one base64 character of the alignment, and `ii` two decimal
//! digits of the bucket index. Built entirely in a stack buffer and
//! returned by value, so encoding never allocates and needs no shared
//! scratch state.

use std::fmt;

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Length of an encoded bucket name in bytes.
pub const BUCKET_NAME_LEN: usize = 11;

/// Fixed-width printable bucket identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketName([u8; BUCKET_NAME_LEN]);

impl BucketName {
    /// Encodes `(size, align, index)` into the fixed name layout.
    ///
    /// Size contributes its low 18 bits (three 6-bit groups, high first),
    /// alignment its low 6 bits, and the index its low two decimal digits.
    /// Larger values wrap; the name is diagnostics only.
    #[must_use]
    pub fn encode(size: u32, align: u32, index: u32) -> Self {
        let mut buf = *b"ZH_???_?_??";

        buf[3] = BASE64_CHARS[((size >> 12) & 0x3f) as usize];
        buf[4] = BASE64_CHARS[((size >> 6) & 0x3f) as usize];
        buf[5] = BASE64_CHARS[(size & 0x3f) as usize];

        buf[7] = BASE64_CHARS[(align & 0x3f) as usize];

        buf[9] = b'0' + ((index / 10) % 10) as u8;
        buf[10] = b'0' + (index % 10) as u8;

        Self(buf)
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Always ASCII by construction.
        std::str::from_utf8(&self.0).unwrap_or("ZH_???_?_??")
    }

    /// The raw fixed-width bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BUCKET_NAME_LEN] {
        &self.0
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
