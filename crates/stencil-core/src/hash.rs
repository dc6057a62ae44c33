//! Hashing for invocation keys and marker uids.

use core::hash::{BuildHasher, Hash};

#[cfg(feature = "std-hash")]
type KeyHasher = std::hash::BuildHasherDefault<std::collections::hash_map::DefaultHasher>;

#[cfg(not(feature = "std-hash"))]
type KeyHasher = std::hash::BuildHasherDefault<ahash::AHasher>;

/// Hashes `value` with a fixed seed, so equal keys map to the same
/// [`Key`](crate::value::Key) on every render.
#[inline]
pub fn hash_one<T: Hash + ?Sized>(value: &T) -> u64 {
    KeyHasher::default().hash_one(value)
}

/// Hashes `value` with a per-process random seed.
pub fn random_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    ahash::RandomState::new().hash_one(value)
}
