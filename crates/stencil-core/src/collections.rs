//! Map types used across the crate.
//!
//! `map` switches between hashbrown and the std maps with the `std-hash`
//! feature. [`OrderedMap`] is used wherever insertion order is observable:
//! cache eviction, transformer priority and per-shape instances.

use indexmap::IndexMap;

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::{HashMap, HashSet};
}

pub type OrderedMap<K, V> = IndexMap<K, V, ahash::RandomState>;

pub fn ordered_map<K, V>() -> OrderedMap<K, V> {
    IndexMap::with_hasher(ahash::RandomState::new())
}
