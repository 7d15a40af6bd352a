// UniqueDictionary and UniqueSet integration suite.
//
// Core invariants exercised:
// - Growth: capacities are always drawn from 0, 1, 2, 4, 7, 14, 28, ...
// - Migration: grow and shrink move every entry into the new table; nothing
//   is lost, duplicated or leaked.
// - Clearing: remove_all releases storage, the keeping variant does not.
// - Equality/hashing: independent of insertion order and of history.
mod common;

use common::Tracker;
use rigid_hash::{RigidDictionary, UniqueDictionary, UniqueSet};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use test_log::test;

const SEQUENCE: [usize; 13] = [0, 1, 2, 4, 7, 14, 28, 56, 112, 224, 448, 896, 1792];

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut h = DefaultHasher::new();
    value.hash(&mut h);
    h.finish()
}

// Test: minimum-capacity construction.
// Verifies: for i in 0..1000 the capacity is the smallest sequence entry
// that is at least i.
#[test]
fn minimum_capacity_uses_sequence() {
    for i in 0..1000 {
        let d: UniqueDictionary<u32, u32> = UniqueDictionary::with_capacity(i);
        let expected = SEQUENCE.iter().copied().find(|&c| c >= i).expect("sequence covers 1000");
        assert_eq!(d.capacity(), expected, "minimum capacity {i}");
        assert!(d.is_empty());
    }
}

// Test: growth through inserts.
// Verifies: capacity only ever takes sequence values and every entry
// survives each migration.
#[test]
fn growth_keeps_every_entry() {
    let mut d = UniqueDictionary::new();
    for k in 0..2000u32 {
        assert_eq!(d.insert_value(k, k.to_string()), None);
        assert!(SEQUENCE.contains(&d.capacity()) || d.capacity() == 3584);
        assert_eq!(d.is_full(), d.len() == d.capacity());
    }
    for k in 0..2000u32 {
        assert_eq!(d.get(&k).map(String::as_str), Some(k.to_string().as_str()));
    }
    assert_eq!(d.capacity(), 3584);
}

// Test: shrink on removal.
// Verifies: draining a large dictionary migrates down the sequence, keeps
// the remaining entries, and never reports capacity below the count.
#[test]
fn removal_shrinks_storage() {
    let mut d: UniqueDictionary<u32, u32> = (0..1000).map(|k| (k, k)).collect();
    let peak = d.capacity();
    let mut capacities = vec![peak];
    for k in 0..995 {
        assert_eq!(d.remove_value(&k), Some(k));
        assert!(d.capacity() >= d.len());
        if capacities.last() != Some(&d.capacity()) {
            capacities.push(d.capacity());
        }
    }
    assert!(capacities.windows(2).all(|w| w[1] < w[0]));
    assert!(d.capacity() < peak);
    for k in 995..1000 {
        assert_eq!(d.get(&k), Some(&k));
    }
}

// Test: clearing semantics.
// Verifies: remove_all resets capacity to 0; the keeping variant preserves
// it.
#[test]
fn remove_all_semantics() {
    let mut d: UniqueDictionary<u32, u32> = (0..50).map(|k| (k, k)).collect();
    let capacity = d.capacity();
    d.remove_all_keeping_capacity();
    assert!(d.is_empty());
    assert_eq!(d.capacity(), capacity);

    d.extend((0..50).map(|k| (k, k)));
    d.remove_all();
    assert!(d.is_empty());
    assert_eq!(d.capacity(), 0);
}

// Test: order-independent equality and hashing.
// Verifies: the same pairs inserted in different orders, or reached through
// different grow/shrink histories, compare equal and hash identically.
#[test]
fn equality_and_hash_ignore_history() {
    let a: UniqueDictionary<u32, String> = (0..500).map(|k| (k, format!("{k}"))).collect();
    let mut b = UniqueDictionary::new();
    for k in (0..800).rev() {
        b.update_value(k, format!("{k}"));
    }
    for k in 500..800 {
        b.remove_value(&k);
    }
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));

    b.update_value(0, "zero".to_string());
    assert_ne!(a, b);
}

// Test: migrations move entries instead of copying them.
// Assumes: Tracked is neither Clone nor Copy.
// Verifies: live instance counts stay exact across grow, shrink and clear.
#[test]
fn migrations_preserve_ownership() {
    let tracker = Tracker::new();
    let mut d = UniqueDictionary::new();
    for k in 0..300u32 {
        d.insert_value(k, tracker.instance(k));
        assert_eq!(tracker.live(), d.len());
    }
    for k in 0..290u32 {
        let v = d.remove_value(&k).expect("present");
        assert_eq!(*v.payload(), k);
        drop(v);
        assert_eq!(tracker.live(), d.len());
    }
    assert!(d.capacity() < 300);
    d.remove_all();
    assert_eq!(tracker.live(), 0);
    assert_eq!(tracker.created(), 300);
}

// Test: UniqueSet with move-only members.
// Verifies: insert hands back duplicates, update swaps, and growth and
// shrinking never leak or duplicate members.
#[test]
fn unique_set_move_only_members() {
    let tracker = Tracker::new();
    {
        let mut s = UniqueSet::new();
        for i in 0..100u32 {
            assert!(s.insert(tracker.instance(i)).is_none());
        }
        let dup = s.insert(tracker.instance(5)).expect("duplicate rejected");
        assert_eq!(*dup.payload(), 5);
        drop(dup);
        let old = s.update(tracker.instance(6)).expect("equal member replaced");
        drop(old);
        assert_eq!(tracker.live(), 100);
        for i in 0..90u32 {
            assert!(s.remove(&i).is_some());
        }
        assert_eq!(tracker.live(), 10);
        assert_eq!(s.len(), 10);
    }
    assert_eq!(tracker.live(), 0);
}

// Test: converting between the rigid and unique flavors.
// Verifies: entries carry over, and a rigid capacity off the sequence is
// normalized on adoption.
#[test]
fn rigid_unique_conversions() {
    let mut rigid = RigidDictionary::with_capacity(20);
    for k in 0..20u8 {
        rigid.insert_value(k, k as u32);
    }
    let mut unique = UniqueDictionary::from(rigid);
    assert_eq!(unique.capacity(), 28);
    unique.insert_value(20, 20);
    let rigid: RigidDictionary<u8, u32> = unique.into();
    assert_eq!(rigid.len(), 21);
    assert!((0..21u8).all(|k| rigid.get(&k) == Some(&(k as u32))));
}
