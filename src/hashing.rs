//! Seeded hashing for table placement and commutative hashing for whole
//! containers.

use core::hash::{BuildHasher, Hash, Hasher};
use std::collections::hash_map::{DefaultHasher, RandomState};

/// Hash `value` with the table's `seed` mixed in ahead of the value's own
/// bytes. Deterministic for a fixed `hasher`, `seed` and value.
#[inline]
pub(crate) fn seeded_hash<S, Q>(hasher: &S, seed: u64, value: &Q) -> u64
where
    S: BuildHasher,
    Q: ?Sized + Hash,
{
    let mut state = hasher.build_hasher();
    state.write_u64(seed);
    value.hash(&mut state);
    state.finish()
}

/// Draw a fresh per-table seed. Every `RandomState` is keyed differently, so
/// two tables of the same size still get unrelated collision patterns.
pub(crate) fn fresh_seed(bucket_count: usize) -> u64 {
    RandomState::new().hash_one(bucket_count)
}

/// Per-member contribution to a commutative container hash.
///
/// Uses a fixed-key hasher so that equal containers hash equally no matter
/// which `BuildHasher` instance each one carries.
pub(crate) struct MemberHasher {
    seed: u64,
}

impl MemberHasher {
    pub(crate) fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub(crate) fn hash_one<T: ?Sized + Hash>(&self, member: &T) -> u64 {
        let mut state = DefaultHasher::new();
        state.write_u64(self.seed);
        member.hash(&mut state);
        state.finish()
    }

    pub(crate) fn hash_pair<K: ?Sized + Hash, V: ?Sized + Hash>(&self, key: &K, value: &V) -> u64 {
        let mut state = DefaultHasher::new();
        state.write_u64(self.seed);
        key.hash(&mut state);
        value.hash(&mut state);
        state.finish()
    }
}

/// Feed an order-independent aggregate into `state`: the snapshot of `state`
/// seeds the member hashes, which are folded with XOR.
pub(crate) fn combine_commutative<H: Hasher>(state: &mut H, count: usize, aggregate: impl FnOnce(u64) -> u64) {
    let seed = state.finish();
    state.write_usize(count);
    state.write_u64(aggregate(seed));
}
