//! UniqueSet: growable hash set backed by a single [`RigidSet`].
//!
//! Capacity always comes from the scale sequence 0, 1, 2, 4, 7, 14, 28, ...
//! Insertion grows to the next adequate scale when the backing set is full;
//! removal shrinks once occupancy falls to half of the previous scale's
//! capacity. A resize moves every member into a freshly seeded table and
//! drops the old one, so only one backing store exists at a time.

use crate::rigid_set::{Index, Indices, Iter, IntoIter, OutputBuffer, RigidSet};
use crate::table::{capacity_for_scale, minimum_capacity, scale_for_capacity, Bucket, Probe};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use hashbrown::DefaultHashBuilder;

#[derive(Clone)]
pub struct UniqueSet<T, S = DefaultHashBuilder> {
    storage: RigidSet<T, S>,
}

impl<T> UniqueSet<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// An empty set able to hold at least `minimum_capacity` members.
    pub fn with_capacity(minimum_capacity: usize) -> Self {
        Self::with_capacity_and_hasher(minimum_capacity, DefaultHashBuilder::default())
    }
}

impl<T, S: Default> Default for UniqueSet<T, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<T, S> UniqueSet<T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(minimum_capacity: usize, hasher: S) -> Self {
        let capacity = capacity_for_scale(scale_for_capacity(minimum_capacity));
        Self {
            storage: RigidSet::with_capacity_and_hasher(capacity, hasher),
        }
    }

    pub fn hasher(&self) -> &S {
        self.storage.hasher()
    }

    /// The backing fixed-capacity set.
    pub fn as_rigid(&self) -> &RigidSet<T, S> {
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

    /// Drop every member and keep the current storage.
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

    pub fn iter(&self) -> Iter<'_, T> {
        self.storage.iter()
    }
}

impl<T, S> UniqueSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Clone,
{
    // Move every member into a new table at the smallest scale holding
    // `minimum_capacity`.
    fn resize(&mut self, minimum_capacity: usize) {
        let capacity = capacity_for_scale(scale_for_capacity(minimum_capacity));
        let fresh = RigidSet::with_capacity_and_hasher(capacity, self.storage.hasher.clone());
        let old = core::mem::replace(&mut self.storage, fresh);
        log::trace!(
            "UniqueSet resized from {} to {} ({} members)",
            old.capacity(),
            capacity,
            old.len()
        );
        for member in old {
            let hash = self.storage.placement_hash(&member);
            self.storage.insert_new(member, hash);
        }
    }

    /// Grow so that `additional` more members fit. Returns whether the
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

    /// Shrink storage to the smallest scale that holds the current members.
    pub fn shrink_to_fit(&mut self) {
        if scale_for_capacity(self.len()) < self.scale() {
            self.resize(self.len());
        }
    }

    /// Drop every member and release storage; capacity becomes 0.
    pub fn remove_all(&mut self) {
        log::trace!("UniqueSet reset from capacity {}", self.capacity());
        self.storage = RigidSet::with_capacity_and_hasher(0, self.storage.hasher.clone());
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.storage.contains(q)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.storage.get(q)
    }

    pub fn index_of<Q>(&self, q: &Q) -> Option<Index>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.storage.index_of(q)
    }

    // `probe` is the miss reported for `item` by the current storage.
    fn insert_absent(&mut self, item: T, probe: Probe) -> Bucket {
        let mut hash = probe.hash;
        if self.ensure_free_capacity(1) && !self.storage.table.is_small() {
            hash = self.storage.hash_of(&item);
        }
        self.storage.insert_new(item, hash)
    }

    /// Inserts `item` if no equal member exists, growing as needed. Returns
    /// `item` back if an equal member is already present.
    pub fn insert(&mut self, item: T) -> Option<T> {
        let probe = self.storage.find(&item);
        if probe.bucket.is_some() {
            return Some(item);
        }
        self.insert_absent(item, probe);
        None
    }

    /// Inserts `item`, replacing and returning an equal member if present.
    pub fn update(&mut self, item: T) -> Option<T> {
        let probe = self.storage.find(&item);
        if let Some(bucket) = probe.bucket {
            return Some(self.storage.members.replace(bucket, item));
        }
        self.insert_absent(item, probe);
        None
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bucket = self.storage.find(q).bucket?;
        Some(self.remove_at(bucket))
    }

    fn remove_at(&mut self, bucket: Bucket) -> T {
        if self.len() > minimum_capacity(self.scale()) {
            return self.storage.remove_at(bucket);
        }
        let member = self.storage.punch_hole(bucket);
        self.resize(self.len());
        member
    }

    /// Grow to fit `maximum_count` more members, then batch-insert them as
    /// [`RigidSet::insert_with_initializer`] does.
    pub fn insert_with_initializer<E, F>(&mut self, maximum_count: usize, initializer: F) -> Result<(), E>
    where
        F: FnMut(&mut OutputBuffer<T>) -> Result<(), E>,
    {
        self.ensure_free_capacity(maximum_count);
        self.storage.insert_with_initializer(maximum_count, initializer)
    }

    pub fn commutative_hash(&self, seed: u64) -> u64 {
        self.storage.commutative_hash(seed)
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.storage.assert_consistent();
        assert_eq!(capacity_for_scale(self.scale()), self.capacity());
    }
}

impl<T, S> core::ops::Index<Index> for UniqueSet<T, S> {
    type Output = T;

    fn index(&self, index: Index) -> &T {
        &self.storage[index]
    }
}

impl<T, S> PartialEq for UniqueSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.storage == other.storage
    }
}

impl<T, S> Eq for UniqueSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
}

impl<T, S> Hash for UniqueSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.storage.hash(state);
    }
}

impl<T: fmt::Debug, S> fmt::Debug for UniqueSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.storage.fmt(f)
    }
}

impl<T, S> Extend<T> for UniqueSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Clone,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for item in iter {
            self.insert(item);
        }
    }
}

impl<T, S> FromIterator<T> for UniqueSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<T, S> From<RigidSet<T, S>> for UniqueSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Adopt the members of `rigid`, migrating them to the next capacity on
    /// the scale sequence when its own capacity is not on it.
    fn from(rigid: RigidSet<T, S>) -> Self {
        let mut set = Self { storage: rigid };
        let scale = set.scale();
        if capacity_for_scale(scale) != set.capacity() {
            set.resize(set.capacity());
        }
        set
    }
}

impl<T, S> From<UniqueSet<T, S>> for RigidSet<T, S> {
    fn from(set: UniqueSet<T, S>) -> Self {
        set.storage
    }
}

impl<T, S> IntoIterator for UniqueSet<T, S> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        self.storage.into_iter()
    }
}

impl<'a, T, S> IntoIterator for &'a UniqueSet<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
