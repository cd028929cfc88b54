//! Hash families for the bucket table.
//!
//! Every function here is a pure function of the key bytes: no seed, no
//! per-map salt. Resizing relies on that to place entries deterministically.

use core::hash::{Hash, Hasher};
use rustc_hash::FxHasher;

/// General-purpose mixer for opaque byte keys.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut h = FxHasher::default();
    h.write(bytes);
    h.finish()
}

/// Hash any `K: Hash` through the same unsalted mixer as [`hash_bytes`].
pub fn hash_opaque<K: ?Sized + Hash>(key: &K) -> u64 {
    let mut h = FxHasher::default();
    key.hash(&mut h);
    h.finish()
}

/// Multiply-xor accumulator for string keys.
pub fn hash_str(s: &str) -> u64 {
    s.bytes()
        .fold(5381u64, |h, b| h.wrapping_mul(33) ^ u64::from(b))
}
