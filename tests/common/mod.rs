// Lifetime-tracking test double shared by the integration suites.
//
// `Tracked<T>` is deliberately neither `Clone` nor `Copy`, so any container
// that compiles against it can only move elements. Every instance registers
// with its `Tracker`; the tracker's live count proves that nothing was leaked
// or dropped twice.
#![allow(dead_code)]

use std::borrow::Borrow;
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Default)]
struct Counts {
    live: Cell<usize>,
    created: Cell<usize>,
}

#[derive(Clone, Default)]
pub struct Tracker {
    counts: Rc<Counts>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances created and not yet dropped.
    pub fn live(&self) -> usize {
        self.counts.live.get()
    }

    /// Instances created over the tracker's lifetime.
    pub fn created(&self) -> usize {
        self.counts.created.get()
    }

    pub fn instance<T>(&self, payload: T) -> Tracked<T> {
        self.counts.live.set(self.counts.live.get() + 1);
        self.counts.created.set(self.counts.created.get() + 1);
        Tracked {
            payload,
            counts: Rc::clone(&self.counts),
        }
    }
}

pub struct Tracked<T> {
    payload: T,
    counts: Rc<Counts>,
}

impl<T> Tracked<T> {
    pub fn payload(&self) -> &T {
        &self.payload
    }
}

impl<T> Drop for Tracked<T> {
    fn drop(&mut self) {
        let live = self.counts.live.get();
        assert!(live > 0, "tracked instance dropped twice");
        self.counts.live.set(live - 1);
    }
}

impl<T: PartialEq> PartialEq for Tracked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl<T: Eq> Eq for Tracked<T> {}

impl<T: Hash> Hash for Tracked<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.hash(state);
    }
}

// Lookups by bare payload; hashing and equality match the payload's.
impl<T> Borrow<T> for Tracked<T> {
    fn borrow(&self) -> &T {
        &self.payload
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.payload.fmt(f)
    }
}
