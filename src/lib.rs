//! rigid-hash: hash sets and dictionaries that only ever move their
//! elements, in a fixed-capacity flavor and a growable one.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep the hash table algorithms independent of element storage so
//!   that the same probing and deletion code serves sets and dictionaries,
//!   fixed and growable.
//! - Layers:
//!   - HashTable: bucket bookkeeping only. Chooses the layout, tracks
//!     occupancy, and runs lookup, Robin Hood insertion and backward-shift
//!     deletion. It reaches elements solely through the `Mover`,
//!     `Rehasher` and `Displacer` callbacks.
//!   - RigidSet<T, S> / RigidDictionary<K, V, S>: a table plus slot storage
//!     (one array for sets, parallel key and value arrays for
//!     dictionaries). Capacity is fixed at construction; exceeding it
//!     panics.
//!   - UniqueSet<T, S> / UniqueDictionary<K, V, S>: own one rigid container
//!     and replace it when it fills up or becomes sparse.
//!
//! Layouts
//! - Capacity <= 15: unhashed. Members occupy buckets `0..len` densely and
//!   lookups scan them.
//! - Larger: open addressing over a power-of-two bucket array loaded to at
//!   most 7/8, so every probe loop meets a free bucket. No tombstones.
//!
//! Constraints
//! - Single-threaded mutation through `&mut self`; lookups through `&self`.
//! - Elements are never cloned by the containers. `T: Clone` is only needed
//!   to clone a container.
//! - Every table draws its own random seed, mixed into each hash, so equal
//!   containers generally have different bucket layouts.
//! - Equality and `Hash` are order-independent: hashing XORs per-member
//!   hashes seeded from the incoming hasher state.
//!
//! Indices
//! - `Index` addresses a bucket. It stays valid until the next insertion or
//!   removal; using a stale index is not detected. Dereferencing an index
//!   whose bucket is unoccupied panics with "Index out of bounds".
//!
//! Growth policy (Unique containers)
//! - Capacities follow the scale sequence 0, 1, 2, 4, 7, 14, 28, 56, ...
//! - Insertion into a full container migrates to the smallest scale with
//!   room; removal at or below half of the previous scale's capacity
//!   migrates down. Migration re-inserts every element into a freshly
//!   seeded table.
//!
//! Notes and non-goals
//! - No thread-safety, serialization or ordered variants.
//! - Iteration order is arbitrary and stable only until the next mutation.

mod bitmap;
mod hashing;
pub mod rigid_dictionary;
pub mod rigid_set;
mod slots;
mod table;
#[cfg(test)]
mod table_proptest;
pub mod unique_dictionary;
pub mod unique_set;

// Public surface
pub use rigid_dictionary::RigidDictionary;
pub use rigid_set::{Index, InsertError, OutputBuffer, RigidSet};
pub use unique_dictionary::UniqueDictionary;
pub use unique_set::UniqueSet;
