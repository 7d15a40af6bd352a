//! RigidSet: fixed-capacity hash set that never reallocates.
//!
//! Elements are only ever moved into and out of storage, so any `T: Eq +
//! Hash` works, including types that cannot be cloned. Inserting into a full
//! set is a contract violation and panics; `try_insert` offers a checked
//! alternative that hands the element back.

use crate::hashing::{combine_commutative, seeded_hash, MemberHasher};
use crate::slots::Slots;
use crate::table::{Bucket, Buckets, Displacer, HashTable, Mover, Probe, Rehasher};
use arrayvec::ArrayVec;
use core::borrow::Borrow;
use core::convert::Infallible;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use hashbrown::DefaultHashBuilder;

/// Largest number of elements staged per chunk by batch insertion.
const STAGING_CHUNK: usize = 16;

/// Position of an element inside a container.
///
/// An index stays meaningful only until the next insertion or removal; using
/// a stale index is a logic error that is not detected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Index(pub(crate) Bucket);

impl Index {
    /// Raw bucket offset of this index.
    pub fn offset(self) -> usize {
        self.0.offset()
    }
}

#[derive(Debug)]
pub enum InsertError<T> {
    /// The container is full; the rejected element is handed back.
    CapacityOverflow(T),
}

impl<T> InsertError<T> {
    pub fn into_inner(self) -> T {
        match self {
            InsertError::CapacityOverflow(item) => item,
        }
    }
}

impl<T> fmt::Display for InsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::CapacityOverflow(_) => f.write_str("fixed capacity exhausted"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for InsertError<T> {}

/// Staging area handed to batch initializers.
pub struct OutputBuffer<T> {
    items: ArrayVec<T, STAGING_CHUNK>,
    limit: usize,
}

impl<T> OutputBuffer<T> {
    fn with_limit(limit: usize) -> Self {
        debug_assert!(limit <= STAGING_CHUNK);
        Self {
            items: ArrayVec::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.limit
    }

    pub fn free_capacity(&self) -> usize {
        self.limit - self.items.len()
    }

    /// Stage one element. Panics if the buffer is full.
    pub fn push(&mut self, item: T) {
        assert!(!self.is_full(), "output buffer overflow");
        self.items.push(item);
    }

    /// Stage elements from `source` until the buffer is full or the source
    /// runs dry. Returns how many were staged.
    pub fn fill_from<I: Iterator<Item = T>>(&mut self, source: &mut I) -> usize {
        let before = self.items.len();
        while !self.is_full() {
            match source.next() {
                Some(item) => self.items.push(item),
                None => break,
            }
        }
        self.items.len() - before
    }
}

// Gives the table access to member storage while it probes and shifts.
pub(crate) struct MemberOps<'a, T, S> {
    members: &'a mut Slots<T>,
    hasher: &'a S,
    seed: u64,
    pending: Option<T>,
}

impl<T, S> Mover for MemberOps<'_, T, S> {
    fn relocate(&mut self, from: Bucket, to: Bucket) {
        self.members.relocate(from, to);
    }
}

impl<T: Hash, S: BuildHasher> Rehasher for MemberOps<'_, T, S> {
    fn hash_at(&self, bucket: Bucket) -> u64 {
        seeded_hash(self.hasher, self.seed, self.members.get(bucket))
    }
}

impl<T: Hash, S: BuildHasher> Displacer for MemberOps<'_, T, S> {
    fn exchange(&mut self, bucket: Bucket) {
        let pending = self.pending.as_mut().expect("insertion carries a pending member");
        self.members.exchange(bucket, pending);
    }

    fn settle(&mut self, bucket: Bucket) {
        let pending = self.pending.take().expect("insertion carries a pending member");
        self.members.put(bucket, pending);
    }
}

#[derive(Clone)]
pub struct RigidSet<T, S = DefaultHashBuilder> {
    pub(crate) table: HashTable,
    pub(crate) members: Slots<T>,
    pub(crate) hasher: S,
}

impl<T> RigidSet<T> {
    /// An empty set with capacity 0.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<T, S: Default> Default for RigidSet<T, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<T, S> RigidSet<T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        let table = HashTable::new(capacity);
        let members = Slots::new(table.bucket_count());
        Self {
            table,
            members,
            hasher,
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn len(&self) -> usize {
        self.table.count()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.table.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn free_capacity(&self) -> usize {
        self.table.free_capacity()
    }

    /// Constant-time check that `self` and `other` are the same container.
    /// `true` implies equality; `false` says nothing about contents.
    pub fn is_identical(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }

    /// Drop every member; capacity is unchanged.
    pub fn remove_all(&mut self) {
        if self.is_empty() {
            return;
        }
        self.members.clear();
        self.table.clear();
    }

    pub fn start_index(&self) -> Index {
        match self.table.first_occupied_from(Bucket::new(0)) {
            Some(bucket) => Index(bucket),
            None => self.end_index(),
        }
    }

    pub fn end_index(&self) -> Index {
        Index(self.table.end_bucket())
    }

    /// Index of the next member after `index`. Panics if `index` does not
    /// address a member.
    pub fn index_after(&self, index: Index) -> Index {
        self.check_index(index);
        let next = Bucket::new(index.offset() + 1);
        match self.table.first_occupied_from(next) {
            Some(bucket) => Index(bucket),
            None => self.end_index(),
        }
    }

    #[inline]
    pub(crate) fn check_index(&self, index: Index) {
        assert!(self.table.is_occupied(index.0), "Index out of bounds");
    }

    pub fn indices(&self) -> Indices<'_> {
        Indices {
            buckets: Buckets::new(&self.table),
            remaining: self.len(),
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buckets: Buckets::new(&self.table),
            members: &self.members,
            remaining: self.len(),
        }
    }
}

impl<T, S> RigidSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    #[inline]
    pub(crate) fn hash_of<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        seeded_hash(&self.hasher, self.table.seed(), q)
    }

    /// Hash for placing `item` into this table; small tables skip hashing.
    #[inline]
    pub(crate) fn placement_hash(&self, item: &T) -> u64 {
        if self.table.is_small() {
            0
        } else {
            self.hash_of(item)
        }
    }

    pub(crate) fn find<Q>(&self, q: &Q) -> Probe
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table
            .find(|| self.hash_of(q), |b| self.members.get(b).borrow() == q)
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).bucket.is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).bucket.map(|b| self.members.get(b))
    }

    pub fn index_of<Q>(&self, q: &Q) -> Option<Index>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).bucket.map(Index)
    }

    /// Place an element known to be absent. `hash` must come from a lookup
    /// against this table (or be [`placement_hash`](Self::placement_hash)).
    pub(crate) fn insert_new(&mut self, item: T, hash: u64) -> Bucket {
        assert!(!self.table.is_full(), "RigidSet capacity overflow");
        let mut ops = MemberOps {
            members: &mut self.members,
            hasher: &self.hasher,
            seed: self.table.seed(),
            pending: Some(item),
        };
        self.table.insert_new(hash, &mut ops)
    }

    /// Inserts `item` if no equal member exists. Returns `item` back
    /// unchanged if one does.
    pub fn insert(&mut self, item: T) -> Option<T> {
        let probe = self.find(&item);
        if probe.bucket.is_some() {
            return Some(item);
        }
        self.insert_new(item, probe.hash);
        None
    }

    /// Like [`insert`](Self::insert), but reports a full set as an error
    /// instead of panicking.
    pub fn try_insert(&mut self, item: T) -> Result<Option<T>, InsertError<T>> {
        let probe = self.find(&item);
        if probe.bucket.is_some() {
            return Ok(Some(item));
        }
        if self.is_full() {
            return Err(InsertError::CapacityOverflow(item));
        }
        self.insert_new(item, probe.hash);
        Ok(None)
    }

    /// Inserts `item` unconditionally; an equal member already present is
    /// replaced and returned.
    pub fn update(&mut self, item: T) -> Option<T> {
        let probe = self.find(&item);
        if let Some(bucket) = probe.bucket {
            return Some(self.members.replace(bucket, item));
        }
        self.insert_new(item, probe.hash);
        None
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bucket = self.find(q).bucket?;
        Some(self.remove_at(bucket))
    }

    pub(crate) fn remove_at(&mut self, bucket: Bucket) -> T {
        self.table.create_hole(bucket);
        let item = self.members.take(bucket);
        let mut ops = MemberOps {
            members: &mut self.members,
            hasher: &self.hasher,
            seed: self.table.seed(),
            pending: None,
        };
        self.table.resolve_hole(bucket, &mut ops);
        item
    }

    /// Remove the member at `bucket` without repairing probe chains. Only
    /// valid right before the whole table is migrated elsewhere.
    pub(crate) fn punch_hole(&mut self, bucket: Bucket) -> T {
        self.table.create_hole(bucket);
        let item = self.members.take(bucket);
        let mut ops = MemberOps {
            members: &mut self.members,
            hasher: &self.hasher,
            seed: self.table.seed(),
            pending: None,
        };
        self.table.finalize_hole(bucket, &mut ops);
        item
    }

    /// Insert up to `maximum_count` elements produced by `initializer`, in
    /// chunks of at most 16 staged elements. Stops after the first chunk the
    /// initializer leaves unfilled. Elements staged before a failure are
    /// still inserted; the error is returned afterwards.
    ///
    /// Panics if `maximum_count` exceeds the free capacity.
    pub fn insert_with_initializer<E, F>(&mut self, maximum_count: usize, mut initializer: F) -> Result<(), E>
    where
        F: FnMut(&mut OutputBuffer<T>) -> Result<(), E>,
    {
        if maximum_count == 0 {
            return Ok(());
        }
        assert!(self.free_capacity() >= maximum_count, "RigidSet capacity overflow");
        let mut remainder = maximum_count;
        while remainder > 0 {
            let chunk = remainder.min(STAGING_CHUNK);
            let mut output = OutputBuffer::with_limit(chunk);
            let result = initializer(&mut output);
            let produced = output.len();
            for item in output.items {
                self.insert(item);
            }
            result?;
            if produced < chunk {
                break;
            }
            remainder -= produced;
        }
        Ok(())
    }

    /// Hash of the members that does not depend on their placement.
    pub fn commutative_hash(&self, seed: u64) -> u64 {
        let hasher = MemberHasher::new(seed);
        self.iter().fold(0, |acc, member| acc ^ hasher.hash_one(member))
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.table.assert_consistent(|b| self.hash_of(self.members.get(b)));
        for offset in 0..self.members.len() {
            let bucket = Bucket::new(offset);
            assert_eq!(self.members.is_initialized(bucket), self.table.is_occupied(bucket));
        }
    }
}

impl<T, S> RigidSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    /// Build a set of the given capacity from at most `capacity` elements of
    /// `source`.
    pub fn from_iter_with_capacity<I>(capacity: usize, source: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut set = Self::with_capacity_and_hasher(capacity, S::default());
        let mut source = source.into_iter();
        set.insert_with_initializer(capacity, |out| {
            out.fill_from(&mut source);
            Ok::<(), Infallible>(())
        })
        .unwrap_or_else(|never| match never {});
        set
    }
}

impl<T, S> core::ops::Index<Index> for RigidSet<T, S> {
    type Output = T;

    fn index(&self, index: Index) -> &T {
        self.check_index(index);
        self.members.get(index.0)
    }
}

impl<T, S> PartialEq for RigidSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.is_identical(other) {
            return true;
        }
        self.len() == other.len() && self.iter().all(|member| other.contains(member))
    }
}

impl<T, S> Eq for RigidSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
}

impl<T, S> Hash for RigidSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        combine_commutative(state, self.len(), |seed| self.commutative_hash(seed));
    }
}

impl<T: fmt::Debug, S> fmt::Debug for RigidSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S> Extend<T> for RigidSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    /// Inserts every element; panics if the set runs out of capacity.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

/// Iterator over the indices of a container's members.
pub struct Indices<'a> {
    buckets: Buckets<'a>,
    remaining: usize,
}

impl Iterator for Indices<'_> {
    type Item = Index;

    fn next(&mut self) -> Option<Index> {
        let bucket = self.buckets.next()?;
        self.remaining -= 1;
        Some(Index(bucket))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Indices<'_> {}

/// Iterator over borrowed members.
pub struct Iter<'a, T> {
    buckets: Buckets<'a>,
    members: &'a Slots<T>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        let bucket = self.buckets.next()?;
        self.remaining -= 1;
        Some(self.members.get(bucket))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// Owning iterator; members not yielded are dropped with it.
pub struct IntoIter<T> {
    table: HashTable,
    members: Slots<T>,
    next: usize,
    remaining: usize,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let bucket = self.table.first_occupied_from(Bucket::new(self.next))?;
        self.next = bucket.offset() + 1;
        self.remaining -= 1;
        Some(self.members.take(bucket))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T, S> IntoIterator for RigidSet<T, S> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        let remaining = self.len();
        IntoIter {
            table: self.table,
            members: self.members,
            next: 0,
            remaining,
        }
    }
}

impl<'a, T, S> IntoIterator for &'a RigidSet<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
