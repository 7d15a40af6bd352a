//! HashTable: bucket bookkeeping shared by every container.
//!
//! The table decides where elements live and keeps probe chains consistent,
//! but never touches an element itself. Whenever it needs an element's hash
//! or wants an element moved, it calls back into the owning container
//! through the [`Mover`], [`Rehasher`] and [`Displacer`] seams.
//!
//! Layouts
//! - Small (capacity <= [`SMALL_CAPACITY_LIMIT`]): no hashing at all. The
//!   occupied buckets are exactly `0..count`; insertion appends at `count`
//!   and removal moves the last occupant into the hole.
//! - Large: open addressing over a power-of-two bucket count with at most
//!   7/8 of the buckets occupied. Insertion probes linearly from the home
//!   bucket and displaces residents that sit closer to their own home (Robin
//!   Hood). Lookups stop at the first unoccupied bucket. Removal never leaves
//!   tombstones: the hole is resolved by shifting later chain members back.

use crate::bitmap::Bitmap;
use crate::hashing::fresh_seed;
use core::ops::Range;

/// Largest capacity served by the unhashed small layout.
pub(crate) const SMALL_CAPACITY_LIMIT: usize = 15;

/// Integer handle to one slot of table storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Bucket(usize);

impl Bucket {
    #[inline]
    pub(crate) const fn new(offset: usize) -> Self {
        Bucket(offset)
    }

    #[inline]
    pub(crate) const fn offset(self) -> usize {
        self.0
    }
}

/// Capacity of the table at `scale` in the growth sequence
/// 0, 1, 2, 4, 7, 14, 28, 56, ...
pub(crate) fn capacity_for_scale(scale: u32) -> usize {
    if scale == 0 {
        return 0;
    }
    let buckets = 1usize << (scale - 1);
    if buckets <= 4 {
        buckets
    } else {
        buckets - buckets / 8
    }
}

/// Smallest scale whose capacity is at least `capacity`.
pub(crate) fn scale_for_capacity(capacity: usize) -> u32 {
    let mut scale = 0;
    while capacity_for_scale(scale) < capacity {
        scale += 1;
        assert!(scale < usize::BITS, "capacity overflow");
    }
    scale
}

/// Occupancy at or below which a growable container at `scale` shrinks.
pub(crate) fn minimum_capacity(scale: u32) -> usize {
    if scale < 2 {
        0
    } else {
        capacity_for_scale(scale - 1) / 2
    }
}

fn bucket_count_for_capacity(capacity: usize) -> usize {
    if capacity <= SMALL_CAPACITY_LIMIT {
        capacity
    } else {
        1 << (scale_for_capacity(capacity) - 1)
    }
}

/// Moves an occupant from one bucket to another, unoccupied one.
pub(crate) trait Mover {
    fn relocate(&mut self, from: Bucket, to: Bucket);
}

/// Recomputes the placement hash of an occupant.
pub(crate) trait Rehasher: Mover {
    fn hash_at(&self, bucket: Bucket) -> u64;
}

/// Carries one pending element through insertion.
pub(crate) trait Displacer: Rehasher {
    /// Swap the pending element with the occupant of `bucket`.
    fn exchange(&mut self, bucket: Bucket);
    /// Move the pending element into the unoccupied `bucket`.
    fn settle(&mut self, bucket: Bucket);
}

/// Result of a lookup. `hash` is only meaningful for large tables; small
/// tables never compute it.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Probe {
    pub(crate) bucket: Option<Bucket>,
    pub(crate) hash: u64,
}

#[derive(Clone, Debug)]
enum Layout {
    Small,
    Large { occupancy: Bitmap, mask: usize },
}

#[derive(Clone, Debug)]
pub(crate) struct HashTable {
    layout: Layout,
    capacity: usize,
    count: usize,
    seed: u64,
}

impl HashTable {
    pub(crate) fn new(capacity: usize) -> Self {
        let buckets = bucket_count_for_capacity(capacity);
        if capacity <= SMALL_CAPACITY_LIMIT {
            return Self {
                layout: Layout::Small,
                capacity,
                count: 0,
                seed: 0,
            };
        }
        Self {
            layout: Layout::Large {
                occupancy: Bitmap::new(buckets),
                mask: buckets - 1,
            },
            capacity,
            count: 0,
            seed: fresh_seed(buckets),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub(crate) fn free_capacity(&self) -> usize {
        self.capacity - self.count
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    #[inline]
    pub(crate) fn is_small(&self) -> bool {
        matches!(self.layout, Layout::Small)
    }

    #[inline]
    pub(crate) fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of slots the element storage must provide.
    #[inline]
    pub(crate) fn bucket_count(&self) -> usize {
        match &self.layout {
            Layout::Small => self.capacity,
            Layout::Large { occupancy, .. } => occupancy.len(),
        }
    }

    /// Sentinel one past the last bucket an iteration can visit.
    #[inline]
    pub(crate) fn end_bucket(&self) -> Bucket {
        match &self.layout {
            Layout::Small => Bucket(self.count),
            Layout::Large { occupancy, .. } => Bucket(occupancy.len()),
        }
    }

    #[inline]
    pub(crate) fn is_occupied(&self, bucket: Bucket) -> bool {
        match &self.layout {
            Layout::Small => bucket.0 < self.count,
            Layout::Large { occupancy, .. } => bucket.0 < occupancy.len() && occupancy.is_set(bucket.0),
        }
    }

    pub(crate) fn first_occupied_from(&self, bucket: Bucket) -> Option<Bucket> {
        match &self.layout {
            Layout::Small => (bucket.0 < self.count).then_some(bucket),
            Layout::Large { occupancy, .. } => occupancy.first_set_from(bucket.0).map(Bucket),
        }
    }

    /// Locate the bucket whose occupant satisfies `eq`. `hash` is evaluated
    /// only when the layout needs it.
    pub(crate) fn find(&self, hash: impl FnOnce() -> u64, mut eq: impl FnMut(Bucket) -> bool) -> Probe {
        match &self.layout {
            Layout::Small => Probe {
                bucket: (0..self.count).map(Bucket).find(|&b| eq(b)),
                hash: 0,
            },
            Layout::Large { occupancy, mask } => {
                let hash = hash();
                let mut pos = hash as usize & mask;
                while occupancy.is_set(pos) {
                    if eq(Bucket(pos)) {
                        return Probe {
                            bucket: Some(Bucket(pos)),
                            hash,
                        };
                    }
                    pos = (pos + 1) & mask;
                }
                Probe { bucket: None, hash }
            }
        }
    }

    /// Place the element carried by `ops`, which must not already be present.
    /// Returns the bucket the new element ends up in; residents displaced on
    /// the way are re-seated further along their chains.
    pub(crate) fn insert_new(&mut self, hash: u64, ops: &mut impl Displacer) -> Bucket {
        debug_assert!(self.count < self.capacity, "insert_new on a full table");
        match &mut self.layout {
            Layout::Small => {
                let bucket = Bucket(self.count);
                self.count += 1;
                ops.settle(bucket);
                bucket
            }
            Layout::Large { occupancy, mask } => {
                let mask = *mask;
                let mut pos = hash as usize & mask;
                let mut distance = 0usize;
                let mut landed = None;
                loop {
                    if !occupancy.is_set(pos) {
                        occupancy.set(pos);
                        self.count += 1;
                        ops.settle(Bucket(pos));
                        return landed.unwrap_or(Bucket(pos));
                    }
                    let resident = pos.wrapping_sub(ops.hash_at(Bucket(pos)) as usize) & mask;
                    if resident < distance {
                        ops.exchange(Bucket(pos));
                        landed.get_or_insert(Bucket(pos));
                        distance = resident;
                    }
                    pos = (pos + 1) & mask;
                    distance += 1;
                }
            }
        }
    }

    /// Mark an occupied bucket as free. The caller must already have moved
    /// the occupant out, and must follow up with [`resolve_hole`] or
    /// [`finalize_hole`] before any lookup.
    ///
    /// [`resolve_hole`]: HashTable::resolve_hole
    /// [`finalize_hole`]: HashTable::finalize_hole
    pub(crate) fn create_hole(&mut self, bucket: Bucket) {
        debug_assert!(self.is_occupied(bucket), "hole at unoccupied {bucket:?}");
        if let Layout::Large { occupancy, .. } = &mut self.layout {
            occupancy.clear(bucket.0);
        }
        self.count -= 1;
    }

    /// Restore lookup invariants after [`create_hole`](HashTable::create_hole)
    /// by backward-shifting the rest of the probe chain.
    pub(crate) fn resolve_hole(&mut self, bucket: Bucket, ops: &mut impl Rehasher) {
        match &mut self.layout {
            Layout::Small => {
                if bucket.0 != self.count {
                    ops.relocate(Bucket(self.count), bucket);
                }
            }
            Layout::Large { occupancy, mask } => {
                let mask = *mask;
                let mut hole = bucket.0;
                let mut pos = (hole + 1) & mask;
                while occupancy.is_set(pos) {
                    let ideal = ops.hash_at(Bucket(pos)) as usize & mask;
                    if hole.wrapping_sub(ideal) & mask < pos.wrapping_sub(ideal) & mask {
                        ops.relocate(Bucket(pos), Bucket(hole));
                        occupancy.set(hole);
                        occupancy.clear(pos);
                        hole = pos;
                    }
                    pos = (pos + 1) & mask;
                }
            }
        }
    }

    /// Cheap alternative to [`resolve_hole`](HashTable::resolve_hole) for a
    /// table that is about to be rebuilt: keeps storage compact but does not
    /// repair probe chains, so lookups may miss afterwards.
    pub(crate) fn finalize_hole(&mut self, bucket: Bucket, ops: &mut impl Mover) {
        if self.is_small() && bucket.0 != self.count {
            ops.relocate(Bucket(self.count), bucket);
        }
    }

    pub(crate) fn clear(&mut self) {
        if let Layout::Large { occupancy, .. } = &mut self.layout {
            occupancy.clear_all();
        }
        self.count = 0;
    }

    pub(crate) fn bucket_iter(&self) -> BucketIterator<'_> {
        BucketIterator { table: self, next: 0 }
    }

    /// Check occupancy bookkeeping and that every occupant is reachable from
    /// its home bucket without crossing a free bucket.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self, hash_at: impl Fn(Bucket) -> u64) {
        assert!(self.count <= self.capacity);
        let Layout::Large { occupancy, mask } = &self.layout else {
            assert!(self.capacity <= SMALL_CAPACITY_LIMIT);
            return;
        };
        assert_eq!(occupancy.count_ones(), self.count);
        assert!(occupancy.len() - occupancy.len() / 8 >= self.capacity);
        let mut it = self.bucket_iter();
        while let Some(region) = it.next_occupied_region() {
            for pos in region {
                let mut probe = hash_at(Bucket(pos)) as usize & mask;
                while probe != pos {
                    assert!(occupancy.is_set(probe), "broken chain for bucket {pos} at {probe}");
                    probe = (probe + 1) & mask;
                }
            }
        }
    }
}

/// Cursor over maximal runs of occupied buckets.
pub(crate) struct BucketIterator<'a> {
    table: &'a HashTable,
    next: usize,
}

impl<'a> BucketIterator<'a> {
    /// Next run of consecutive occupied bucket offsets, in increasing order.
    pub(crate) fn next_occupied_region(&mut self) -> Option<Range<usize>> {
        match &self.table.layout {
            Layout::Small => {
                if self.next >= self.table.count {
                    return None;
                }
                let region = self.next..self.table.count;
                self.next = self.table.count;
                Some(region)
            }
            Layout::Large { occupancy, .. } => {
                let start = occupancy.first_set_from(self.next)?;
                let end = occupancy.first_clear_from(start).unwrap_or(occupancy.len());
                self.next = end;
                Some(start..end)
            }
        }
    }
}

/// Occupied buckets in increasing order, flattened from the regions of a
/// [`BucketIterator`].
pub(crate) struct Buckets<'a> {
    regions: BucketIterator<'a>,
    current: Range<usize>,
}

impl<'a> Buckets<'a> {
    pub(crate) fn new(table: &'a HashTable) -> Self {
        Self {
            regions: table.bucket_iter(),
            current: 0..0,
        }
    }
}

impl<'a> Iterator for Buckets<'a> {
    type Item = Bucket;

    #[inline]
    fn next(&mut self) -> Option<Bucket> {
        loop {
            if let Some(offset) = self.current.next() {
                return Some(Bucket(offset));
            }
            self.current = self.regions.next_occupied_region()?;
        }
    }
}
