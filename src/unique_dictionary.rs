//! UniqueDictionary: growable key/value map backed by a single
//! [`RigidDictionary`], with the same growth and shrink policy as
//! [`UniqueSet`](crate::UniqueSet).

use crate::rigid_dictionary::{IntoIter, Iter, IterMut, RigidDictionary, Values, ValuesMut};
use crate::rigid_set::{Index, Indices, RigidSet};
use crate::table::{capacity_for_scale, minimum_capacity, scale_for_capacity, Bucket, Probe};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use hashbrown::DefaultHashBuilder;

#[derive(Clone)]
pub struct UniqueDictionary<K, V, S = DefaultHashBuilder> {
    storage: RigidDictionary<K, V, S>,
}

impl<K, V> UniqueDictionary<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// An empty dictionary able to hold at least `minimum_capacity` entries.
    pub fn with_capacity(minimum_capacity: usize) -> Self {
        Self::with_capacity_and_hasher(minimum_capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S: Default> Default for UniqueDictionary<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> UniqueDictionary<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(minimum_capacity: usize, hasher: S) -> Self {
        let capacity = capacity_for_scale(scale_for_capacity(minimum_capacity));
        Self {
            storage: RigidDictionary::with_capacity_and_hasher(capacity, hasher),
        }
    }

    pub fn hasher(&self) -> &S {
        self.storage.hasher()
    }

    pub fn keys(&self) -> &RigidSet<K, S> {
        self.storage.keys()
    }

    /// The backing fixed-capacity dictionary.
    pub fn as_rigid(&self) -> &RigidDictionary<K, V, S> {
        &self.storage
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// True when the next insertion of a new element migrates storage.
    pub fn is_full(&self) -> bool {
        self.storage.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    pub fn free_capacity(&self) -> usize {
        self.storage.free_capacity()
    }

    pub fn is_identical(&self, other: &Self) -> bool {
        self.storage.is_identical(&other.storage)
    }

    fn scale(&self) -> u32 {
        scale_for_capacity(self.capacity())
    }

    pub fn remove_all_keeping_capacity(&mut self) {
        self.storage.remove_all();
    }

    pub fn start_index(&self) -> Index {
        self.storage.start_index()
    }

    pub fn end_index(&self) -> Index {
        self.storage.end_index()
    }

    pub fn index_after(&self, index: Index) -> Index {
        self.storage.index_after(index)
    }

    pub fn indices(&self) -> Indices<'_> {
        self.storage.indices()
    }

    pub fn key_value_at(&self, index: Index) -> (&K, &V) {
        self.storage.key_value_at(index)
    }

    pub fn value_at_mut(&mut self, index: Index) -> &mut V {
        self.storage.value_at_mut(index)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.storage.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.storage.iter_mut()
    }

    pub fn values(&self) -> Values<'_, K, V> {
        self.storage.values()
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, V> {
        self.storage.values_mut()
    }
}

impl<K, V, S> UniqueDictionary<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    fn resize(&mut self, minimum_capacity: usize) {
        let capacity = capacity_for_scale(scale_for_capacity(minimum_capacity));
        let fresh = RigidDictionary::with_capacity_and_hasher(capacity, self.hasher().clone());
        let old = core::mem::replace(&mut self.storage, fresh);
        log::trace!(
            "UniqueDictionary resized from {} to {} ({} entries)",
            old.capacity(),
            capacity,
            old.len()
        );
        for (key, value) in old {
            let hash = self.storage.keys.placement_hash(&key);
            self.storage.insert_new(key, value, hash);
        }
    }

    /// Grow so that `additional` more entries fit. Returns whether the
    /// storage was replaced, which invalidates any previously computed hash.
    fn ensure_free_capacity(&mut self, additional: usize) -> bool {
        if self.free_capacity() >= additional {
            return false;
        }
        let required = self.len().checked_add(additional).expect("capacity overflow");
        self.resize(required);
        true
    }

    pub fn reserve(&mut self, additional: usize) {
        self.ensure_free_capacity(additional);
    }

    pub fn shrink_to_fit(&mut self) {
        if scale_for_capacity(self.len()) < self.scale() {
            self.resize(self.len());
        }
    }

    /// Drop every entry and release storage; capacity becomes 0.
    pub fn remove_all(&mut self) {
        log::trace!("UniqueDictionary reset from capacity {}", self.capacity());
        self.storage = RigidDictionary::with_capacity_and_hasher(0, self.hasher().clone());
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.storage.contains_key(key)
    }

    pub fn index_of<Q>(&self, key: &Q) -> Option<Index>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.storage.index_of(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.storage.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.storage.get_mut(key)
    }

    // `probe` is the miss reported for `key` by the current storage.
    fn insert_absent(&mut self, key: K, value: V, probe: Probe) -> Bucket {
        let mut hash = probe.hash;
        if self.ensure_free_capacity(1) && !self.storage.keys.table.is_small() {
            hash = self.storage.keys.hash_of(&key);
        }
        self.storage.insert_new(key, value, hash)
    }

    /// Adds `value` under `key` unless the key is already present, in which
    /// case `value` is handed back.
    pub fn insert_value(&mut self, key: K, value: V) -> Option<V> {
        let probe = self.storage.keys.find(&key);
        if probe.bucket.is_some() {
            return Some(value);
        }
        self.insert_absent(key, value, probe);
        None
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn update_value(&mut self, key: K, value: V) -> Option<V> {
        let probe = self.storage.keys.find(&key);
        if let Some(bucket) = probe.bucket {
            return Some(self.storage.values.replace(bucket, value));
        }
        self.insert_absent(key, value, probe);
        None
    }

    pub fn memoized_value<F>(&mut self, key: K, f: F) -> &V
    where
        F: FnOnce(&K) -> V,
    {
        let probe = self.storage.keys.find(&key);
        let bucket = match probe.bucket {
            Some(bucket) => bucket,
            None => {
                let value = f(&key);
                self.insert_absent(key, value, probe)
            }
        };
        self.storage.values.get(bucket)
    }

    /// Fallible [`memoized_value`](Self::memoized_value); a failing `f`
    /// leaves the dictionary, including its capacity, unchanged.
    pub fn try_memoized_value<E, F>(&mut self, key: K, f: F) -> Result<&V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        let probe = self.storage.keys.find(&key);
        let bucket = match probe.bucket {
            Some(bucket) => bucket,
            None => {
                let value = f(&key)?;
                self.insert_absent(key, value, probe)
            }
        };
        Ok(self.storage.values.get(bucket))
    }

    /// See [`RigidDictionary::update_value_with`]; insertion grows and
    /// removal may shrink.
    pub fn update_value_with<R, F>(&mut self, key: K, f: F) -> R
    where
        F: FnOnce(&mut Option<V>) -> R,
    {
        let probe = self.storage.keys.find(&key);
        let Some(bucket) = probe.bucket else {
            let mut value = None;
            let result = f(&mut value);
            if let Some(value) = value {
                self.insert_absent(key, value, probe);
            }
            return result;
        };
        let value = self.storage.values.take_slot(bucket);
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
        let bucket = self.storage.keys.find(key).bucket?;
        let (key, value) = self.remove_bucket(bucket);
        Some((key, value.expect("occupied bucket must hold a value")))
    }

    fn remove_bucket(&mut self, bucket: Bucket) -> (K, Option<V>) {
        if self.len() > minimum_capacity(self.scale()) {
            return self.storage.remove_bucket(bucket);
        }
        let entry = self.storage.punch_hole(bucket);
        self.resize(self.len());
        entry
    }

    pub fn is_equal_by<F>(&self, other: &Self, eq: F) -> bool
    where
        F: FnMut(&V, &V) -> bool,
    {
        self.storage.is_equal_by(&other.storage, eq)
    }

    pub fn commutative_hash(&self, seed: u64) -> u64
    where
        V: Hash,
    {
        self.storage.commutative_hash(seed)
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.storage.assert_consistent();
        assert_eq!(capacity_for_scale(self.scale()), self.capacity());
    }
}

// Restores or removes the edited entry once `update_value_with` is done with
// it, panics included. Removal may shrink the storage.
struct ValueEdit<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    dict: &'a mut UniqueDictionary<K, V, S>,
    bucket: Bucket,
    value: Option<V>,
}

impl<K, V, S> Drop for ValueEdit<'_, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    fn drop(&mut self) {
        match self.value.take() {
            Some(value) => self.dict.storage.values.put(self.bucket, value),
            None => {
                self.dict.remove_bucket(self.bucket);
            }
        }
    }
}

impl<K, V, S> PartialEq for UniqueDictionary<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.storage == other.storage
    }
}

impl<K, V, S> Eq for UniqueDictionary<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Hash for UniqueDictionary<K, V, S>
where
    K: Eq + Hash,
    V: Hash,
    S: BuildHasher,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.storage.hash(state);
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for UniqueDictionary<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.storage.fmt(f)
    }
}

impl<K, V, S> Extend<(K, V)> for UniqueDictionary<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Stores every entry with [`update_value`](UniqueDictionary::update_value).
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.update_value(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for UniqueDictionary<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Self::default();
        dict.extend(iter);
        dict
    }
}

impl<K, V, S> From<RigidDictionary<K, V, S>> for UniqueDictionary<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    fn from(rigid: RigidDictionary<K, V, S>) -> Self {
        let mut dict = Self { storage: rigid };
        if capacity_for_scale(dict.scale()) != dict.capacity() {
            dict.resize(dict.capacity());
        }
        dict
    }
}

impl<K, V, S> From<UniqueDictionary<K, V, S>> for RigidDictionary<K, V, S> {
    fn from(dict: UniqueDictionary<K, V, S>) -> Self {
        dict.storage
    }
}

impl<K, V, S> IntoIterator for UniqueDictionary<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        self.storage.into_iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a UniqueDictionary<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut UniqueDictionary<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}
