//! RigidDictionary: fixed-capacity key/value map.
//!
//! The keys live in a [`RigidSet`], which alone drives bucket assignment;
//! values sit in a parallel slot array at the same buckets. A value slot is
//! live exactly when its key bucket is occupied, so every move the table asks
//! for is applied to both arrays together.

use crate::hashing::{combine_commutative, seeded_hash, MemberHasher};
use crate::rigid_set::{Index, Indices, InsertError, RigidSet};
use crate::slots::Slots;
use crate::table::{Bucket, Buckets, Displacer, HashTable, Mover, Rehasher};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use hashbrown::DefaultHashBuilder;

// Table callbacks over the key and value arrays together.
struct EntryOps<'a, K, V, S> {
    keys: &'a mut Slots<K>,
    values: &'a mut Slots<V>,
    hasher: &'a S,
    seed: u64,
    pending: Option<(K, V)>,
}

impl<K, V, S> Mover for EntryOps<'_, K, V, S> {
    fn relocate(&mut self, from: Bucket, to: Bucket) {
        self.keys.relocate(from, to);
        self.values.relocate(from, to);
    }
}

impl<K: Hash, V, S: BuildHasher> Rehasher for EntryOps<'_, K, V, S> {
    fn hash_at(&self, bucket: Bucket) -> u64 {
        seeded_hash(self.hasher, self.seed, self.keys.get(bucket))
    }
}

impl<K: Hash, V, S: BuildHasher> Displacer for EntryOps<'_, K, V, S> {
    fn exchange(&mut self, bucket: Bucket) {
        let (key, value) = self.pending.as_mut().expect("insertion carries a pending entry");
        self.keys.exchange(bucket, key);
        self.values.exchange(bucket, value);
    }

    fn settle(&mut self, bucket: Bucket) {
        let (key, value) = self.pending.take().expect("insertion carries a pending entry");
        self.keys.put(bucket, key);
        self.values.put(bucket, value);
    }
}

#[derive(Clone)]
pub struct RigidDictionary<K, V, S = DefaultHashBuilder> {
    pub(crate) keys: RigidSet<K, S>,
    pub(crate) values: Slots<V>,
}

impl<K, V> RigidDictionary<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S: Default> Default for RigidDictionary<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> RigidDictionary<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        let keys = RigidSet::with_capacity_and_hasher(capacity, hasher);
        let values = Slots::new(keys.table.bucket_count());
        Self { keys, values }
    }

    pub fn hasher(&self) -> &S {
        self.keys.hasher()
    }

    /// The keys, as a set sharing this dictionary's indices.
    pub fn keys(&self) -> &RigidSet<K, S> {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.keys.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.keys.capacity()
    }

    pub fn free_capacity(&self) -> usize {
        self.keys.free_capacity()
    }

    /// Constant-time check that `self` and `other` are the same dictionary.
    pub fn is_identical(&self, other: &Self) -> bool {
        self.keys.is_identical(&other.keys)
    }

    /// Drop every entry; capacity is unchanged.
    pub fn remove_all(&mut self) {
        if self.is_empty() {
            return;
        }
        self.values.clear();
        self.keys.remove_all();
    }

    pub fn start_index(&self) -> Index {
        self.keys.start_index()
    }

    pub fn end_index(&self) -> Index {
        self.keys.end_index()
    }

    pub fn index_after(&self, index: Index) -> Index {
        self.keys.index_after(index)
    }

    pub fn indices(&self) -> Indices<'_> {
        self.keys.indices()
    }

    /// Entry at `index`. Panics if `index` does not address an entry.
    pub fn key_value_at(&self, index: Index) -> (&K, &V) {
        self.keys.check_index(index);
        (self.keys.members.get(index.0), self.values.get(index.0))
    }

    pub fn value_at_mut(&mut self, index: Index) -> &mut V {
        self.keys.check_index(index);
        self.values.get_mut(index.0)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: Buckets::new(&self.keys.table),
            keys: &self.keys.members,
            values: &self.values,
            remaining: self.len(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            keys: self.keys.iter(),
            values: ValuesMut {
                slots: self.values.raw_iter_mut(),
                remaining: self.keys.len(),
            },
        }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, V> {
        ValuesMut {
            remaining: self.len(),
            slots: self.values.raw_iter_mut(),
        }
    }
}

impl<K, V, S> RigidDictionary<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.keys.contains(key)
    }

    pub fn index_of<Q>(&self, key: &Q) -> Option<Index>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.keys.index_of(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bucket = self.keys.find(key).bucket?;
        Some(self.values.get(bucket))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bucket = self.keys.find(key).bucket?;
        Some(self.values.get_mut(bucket))
    }

    /// Place an entry whose key is known to be absent; returns its bucket.
    pub(crate) fn insert_new(&mut self, key: K, value: V, hash: u64) -> Bucket {
        assert!(!self.keys.table.is_full(), "RigidDictionary capacity overflow");
        let mut ops = EntryOps {
            keys: &mut self.keys.members,
            values: &mut self.values,
            hasher: &self.keys.hasher,
            seed: self.keys.table.seed(),
            pending: Some((key, value)),
        };
        self.keys.table.insert_new(hash, &mut ops)
    }

    /// Adds `value` under `key` unless the key is already present, in which
    /// case `value` is handed back and the stored value is untouched.
    pub fn insert_value(&mut self, key: K, value: V) -> Option<V> {
        let probe = self.keys.find(&key);
        if probe.bucket.is_some() {
            return Some(value);
        }
        self.insert_new(key, value, probe.hash);
        None
    }

    /// Checked [`insert_value`](Self::insert_value): a full dictionary hands
    /// the entry back instead of panicking.
    pub fn try_insert_value(&mut self, key: K, value: V) -> Result<Option<V>, InsertError<(K, V)>> {
        let probe = self.keys.find(&key);
        if probe.bucket.is_some() {
            return Ok(Some(value));
        }
        if self.is_full() {
            return Err(InsertError::CapacityOverflow((key, value)));
        }
        self.insert_new(key, value, probe.hash);
        Ok(None)
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn update_value(&mut self, key: K, value: V) -> Option<V> {
        let probe = self.keys.find(&key);
        if let Some(bucket) = probe.bucket {
            return Some(self.values.replace(bucket, value));
        }
        self.insert_new(key, value, probe.hash);
        None
    }

    /// Returns the value stored under `key`, first inserting `f(&key)` if
    /// the key is absent.
    pub fn memoized_value<F>(&mut self, key: K, f: F) -> &V
    where
        F: FnOnce(&K) -> V,
    {
        let probe = self.keys.find(&key);
        let bucket = match probe.bucket {
            Some(bucket) => bucket,
            None => {
                assert!(!self.is_full(), "RigidDictionary capacity overflow");
                let value = f(&key);
                self.insert_new(key, value, probe.hash)
            }
        };
        self.values.get(bucket)
    }

    /// Fallible [`memoized_value`](Self::memoized_value). When `f` fails the
    /// dictionary is left exactly as it was.
    pub fn try_memoized_value<E, F>(&mut self, key: K, f: F) -> Result<&V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        let probe = self.keys.find(&key);
        let bucket = match probe.bucket {
            Some(bucket) => bucket,
            None => {
                assert!(!self.is_full(), "RigidDictionary capacity overflow");
                let value = f(&key)?;
                self.insert_new(key, value, probe.hash)
            }
        };
        Ok(self.values.get(bucket))
    }

    /// Hand the value stored under `key` (or `None`) to `f` for in-place
    /// editing. Leaving `Some` behind stores it, inserting the key if it was
    /// absent; leaving `None` removes the entry.
    pub fn update_value_with<R, F>(&mut self, key: K, f: F) -> R
    where
        F: FnOnce(&mut Option<V>) -> R,
    {
        let probe = self.keys.find(&key);
        let Some(bucket) = probe.bucket else {
            let mut value = None;
            let result = f(&mut value);
            if let Some(value) = value {
                self.insert_new(key, value, probe.hash);
            }
            return result;
        };
        let value = self.values.take_slot(bucket);
        let mut edit = ValueEdit {
            dict: self,
            bucket,
            value,
        };
        let result = f(&mut edit.value);
        drop(edit);
        result
    }

    pub fn remove_value<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bucket = self.keys.find(key).bucket?;
        Some(self.remove_at(bucket))
    }

    pub(crate) fn remove_at(&mut self, bucket: Bucket) -> (K, V) {
        let (key, value) = self.remove_bucket(bucket);
        (key, value.expect("occupied bucket must hold a value"))
    }

    // The value slot may already have been taken by `update_value_with`.
    pub(crate) fn remove_bucket(&mut self, bucket: Bucket) -> (K, Option<V>) {
        self.keys.table.create_hole(bucket);
        let key = self.keys.members.take(bucket);
        let value = self.values.take_slot(bucket);
        let mut ops = EntryOps {
            keys: &mut self.keys.members,
            values: &mut self.values,
            hasher: &self.keys.hasher,
            seed: self.keys.table.seed(),
            pending: None,
        };
        self.keys.table.resolve_hole(bucket, &mut ops);
        (key, value)
    }

    /// Remove the entry at `bucket` without repairing probe chains. Only
    /// valid right before the whole table is migrated elsewhere.
    pub(crate) fn punch_hole(&mut self, bucket: Bucket) -> (K, Option<V>) {
        self.keys.table.create_hole(bucket);
        let key = self.keys.members.take(bucket);
        let value = self.values.take_slot(bucket);
        let mut ops = EntryOps {
            keys: &mut self.keys.members,
            values: &mut self.values,
            hasher: &self.keys.hasher,
            seed: self.keys.table.seed(),
            pending: None,
        };
        self.keys.table.finalize_hole(bucket, &mut ops);
        (key, value)
    }

    /// Order-independent comparison with a caller-chosen value equivalence.
    pub fn is_equal_by<F>(&self, other: &Self, mut eq: F) -> bool
    where
        F: FnMut(&V, &V) -> bool,
    {
        if self.is_identical(other) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|(key, value)| match other.keys.find(key).bucket {
            Some(bucket) => eq(value, other.values.get(bucket)),
            None => false,
        })
    }

    pub fn commutative_hash(&self, seed: u64) -> u64
    where
        V: Hash,
    {
        let hasher = MemberHasher::new(seed);
        self.iter()
            .fold(0, |acc, (key, value)| acc ^ hasher.hash_pair(key, value))
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.keys.assert_consistent();
        for offset in 0..self.values.len() {
            let bucket = Bucket::new(offset);
            assert_eq!(
                self.values.is_initialized(bucket),
                self.keys.table.is_occupied(bucket),
                "value slot {offset} out of sync with its key"
            );
        }
    }
}

impl<K, V, S> RigidDictionary<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    /// Build a dictionary of the given capacity. Later duplicates replace
    /// earlier values; running out of capacity panics.
    pub fn from_iter_with_capacity<I>(capacity: usize, source: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut dict = Self::with_capacity_and_hasher(capacity, S::default());
        dict.extend(source);
        dict
    }
}

// Holds a value taken out for `update_value_with`. On drop, including
// during unwinding, the value goes back to its slot or the entry is removed.
struct ValueEdit<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    dict: &'a mut RigidDictionary<K, V, S>,
    bucket: Bucket,
    value: Option<V>,
}

impl<K, V, S> Drop for ValueEdit<'_, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn drop(&mut self) {
        match self.value.take() {
            Some(value) => self.dict.values.put(self.bucket, value),
            None => {
                self.dict.remove_bucket(self.bucket);
            }
        }
    }
}

impl<K, V, S> PartialEq for RigidDictionary<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.is_equal_by(other, |a, b| a == b)
    }
}

impl<K, V, S> Eq for RigidDictionary<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Hash for RigidDictionary<K, V, S>
where
    K: Eq + Hash,
    V: Hash,
    S: BuildHasher,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        combine_commutative(state, self.len(), |seed| self.commutative_hash(seed));
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for RigidDictionary<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for RigidDictionary<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Stores every entry with [`update_value`](RigidDictionary::update_value).
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.update_value(key, value);
        }
    }
}

pub struct Iter<'a, K, V> {
    buckets: Buckets<'a>,
    keys: &'a Slots<K>,
    values: &'a Slots<V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        let bucket = self.buckets.next()?;
        self.remaining -= 1;
        Some((self.keys.get(bucket), self.values.get(bucket)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Mutable values in bucket order. Live value slots are exactly the occupied
/// buckets, so skipping empty slots visits the same buckets as [`Iter`].
pub struct ValuesMut<'a, V> {
    slots: core::slice::IterMut<'a, Option<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for ValuesMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.slots.by_ref().find_map(Option::as_mut)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for ValuesMut<'_, V> {}

pub struct IterMut<'a, K, V> {
    keys: crate::rigid_set::Iter<'a, K>,
    values: ValuesMut<'a, V>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<(&'a K, &'a mut V)> {
        Some((self.keys.next()?, self.values.next()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// Owning iterator over entries.
pub struct IntoIter<K, V> {
    table: HashTable,
    keys: Slots<K>,
    values: Slots<V>,
    next: usize,
    remaining: usize,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        let bucket = self.table.first_occupied_from(Bucket::new(self.next))?;
        self.next = bucket.offset() + 1;
        self.remaining -= 1;
        Some((self.keys.take(bucket), self.values.take(bucket)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V, S> IntoIterator for RigidDictionary<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        let remaining = self.len();
        IntoIter {
            table: self.keys.table,
            keys: self.keys.members,
            values: self.values,
            next: 0,
            remaining,
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a RigidDictionary<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut RigidDictionary<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}
