//! 32-bit FNV-1a hash.
//!
//! The request-to-backend mapping is `fnv1a(path) % |healthy|`, so this
//! function is the routing contract: the vectors in the tests below pin
//! it against reimplementation drift.

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Computes the 32-bit FNV-1a hash of `data`.
#[must_use]
pub fn fnv1a(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in data {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
