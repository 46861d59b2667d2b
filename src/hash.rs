//! Zero-sized hash builder shared by the engine's internal maps.
//!
//! Argument tries, dependency edges and listener sets are all keyed by values
//! the caller controls but never by untrusted network input, so a fixed-seed
//! foldhash is enough and keeps every map free of per-instance hasher state.

use std::collections::HashMap;
use std::hash::BuildHasher;

use foldhash::fast::{FixedState, FoldHasher};

/// Fixed-seed foldhash builder.
///
/// - Zero-sized (`size_of::<FastHashBuilder>()` == 0)
/// - Deterministic across instances, so two maps built independently agree on
///   bucket placement for equal keys
#[derive(Clone, Copy, Debug, Default)]
pub struct FastHashBuilder;

impl BuildHasher for FastHashBuilder {
    type Hasher = FoldHasher<'static>;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        FixedState::with_seed(0x2d35_8dcc_aa6c_78a5).build_hasher()
    }
}

/// `HashMap` using [`FastHashBuilder`].
pub type FastHashMap<K, V> = HashMap<K, V, FastHashBuilder>;

/// Create an empty [`FastHashMap`].
pub fn fast_map<K, V>() -> FastHashMap<K, V> {
    HashMap::with_hasher(FastHashBuilder)
}
