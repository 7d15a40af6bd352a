#![cfg(test)]

// Property tests for the containers kept inside the crate so they can check
// internal consistency after every operation.

use crate::{RigidDictionary, RigidSet, UniqueDictionary, UniqueSet};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

const SEQUENCE: [usize; 13] = [0, 1, 2, 4, 7, 14, 28, 56, 112, 224, 448, 896, 1792];

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations: indices shrink to earlier keys, the pool shrinks,
// and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Update(usize, i32),
    Memoize(usize, i32),
    Edit(usize, Option<i32>),
    Remove(usize),
    Find(usize),
    Contains(String),
    Iterate,
    Clear(bool),
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

// Pools run past the small-layout limit so both layouts and the transition
// between them get exercised.
fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=48).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Update(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Memoize(i, v)),
            2 => (idx.clone(), proptest::option::of(-5i32..5)).prop_map(|(i, d)| OpI::Edit(i, d)),
            3 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,4}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => Just(OpI::Iterate),
            1 => any::<bool>().prop_map(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn edit(slot: &mut Option<i32>, delta: Option<i32>) {
    *slot = delta.map(|d| slot.unwrap_or(0).saturating_add(d));
}

// Index walking and iteration must both agree with the model.
macro_rules! check_contents {
    ($sut:expr, $model:expr) => {{
        let walked: BTreeMap<Key, i32> = {
            let mut out = BTreeMap::new();
            let mut i = $sut.start_index();
            while i != $sut.end_index() {
                let (k, v) = $sut.key_value_at(i);
                prop_assert!(out.insert(k.clone(), *v).is_none(), "index walk repeated {:?}", k);
                i = $sut.index_after(i);
            }
            out
        };
        let iterated: BTreeMap<Key, i32> = $sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let expected: BTreeMap<Key, i32> = $model.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(&walked, &expected);
        prop_assert_eq!(&iterated, &expected);
        prop_assert_eq!($sut.indices().len(), $model.len());
    }};
}

// Property: UniqueDictionary behaves like std::collections::HashMap.
// - `insert_value` rejects duplicates and returns the rejected value.
// - `update_value`/`remove_value` return what the model returns.
// - `memoized_value` and `update_value_with` match `entry` semantics.
// - Capacity always comes from the scale sequence and never drops below len.
// - Probe chains stay intact after every operation.
fn run_unique_dictionary<S>(mut sut: UniqueDictionary<Key, i32, S>, pool: &[String], ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                let expected = if model.contains_key(&k) {
                    Some(v)
                } else {
                    model.insert(k.clone(), v);
                    None
                };
                prop_assert_eq!(sut.insert_value(k, v), expected);
            }
            OpI::Update(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.update_value(k.clone(), v), model.insert(k, v));
            }
            OpI::Memoize(i, v) => {
                let k = key_from(pool, i);
                let expected = *model.entry(k.clone()).or_insert(v);
                let mut calls = 0;
                let got = *sut.memoized_value(k, |_| {
                    calls += 1;
                    v
                });
                prop_assert_eq!(got, expected);
                prop_assert!(calls <= 1);
            }
            OpI::Edit(i, d) => {
                let k = key_from(pool, i);
                let mut slot = model.remove(&k);
                edit(&mut slot, d);
                if let Some(v) = slot {
                    model.insert(k.clone(), v);
                }
                sut.update_value_with(k, |s| edit(s, d));
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove_value(&k), model.remove(&k));
                prop_assert!(!sut.contains_key(&k));
            }
            OpI::Find(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains_key(s.as_str()), model.keys().any(|k| k.0 == s));
            }
            OpI::Iterate => check_contents!(sut, model),
            OpI::Clear(keep) => {
                let before = sut.capacity();
                if keep {
                    sut.remove_all_keeping_capacity();
                    prop_assert_eq!(sut.capacity(), before);
                } else {
                    sut.remove_all();
                    prop_assert_eq!(sut.capacity(), 0);
                }
                model.clear();
            }
        }

        sut.assert_consistent();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.capacity() >= sut.len());
        prop_assert!(SEQUENCE.contains(&sut.capacity()));
    }
    check_contents!(sut, model);
    Ok(())
}

// Property: RigidDictionary sized to the pool never overflows and otherwise
// matches the model; capacity never changes.
fn run_rigid_dictionary<S>(mut sut: RigidDictionary<Key, i32, S>, pool: &[String], ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: BuildHasher,
{
    let capacity = sut.capacity();
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                let expected = if model.contains_key(&k) {
                    Some(v)
                } else {
                    model.insert(k.clone(), v);
                    None
                };
                prop_assert_eq!(sut.insert_value(k, v), expected);
            }
            OpI::Update(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.update_value(k.clone(), v), model.insert(k, v));
            }
            OpI::Memoize(i, v) => {
                let k = key_from(pool, i);
                let expected = *model.entry(k.clone()).or_insert(v);
                prop_assert_eq!(*sut.memoized_value(k, |_| v), expected);
            }
            OpI::Edit(i, d) => {
                let k = key_from(pool, i);
                let mut slot = model.remove(&k);
                edit(&mut slot, d);
                if let Some(v) = slot {
                    model.insert(k.clone(), v);
                }
                sut.update_value_with(k, |s| edit(s, d));
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove_value(&k), model.remove(&k));
            }
            OpI::Find(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains_key(s.as_str()), model.keys().any(|k| k.0 == s));
            }
            OpI::Iterate => check_contents!(sut, model),
            OpI::Clear(_) => {
                sut.remove_all();
                model.clear();
            }
        }

        sut.assert_consistent();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.capacity(), capacity);
        prop_assert_eq!(sut.free_capacity(), capacity - model.len());
        prop_assert_eq!(sut.is_full(), model.len() == capacity);
    }
    check_contents!(sut, model);
    Ok(())
}

// Property: UniqueSet and RigidSet agree with std::collections::HashSet; the
// two sets built from the same operations compare equal.
fn run_sets<S>(mut unique: UniqueSet<Key, S>, mut rigid: RigidSet<Key, S>, pool: &[String], ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone,
{
    let mut model: HashSet<Key> = HashSet::new();
    for op in ops {
        match op {
            OpI::Insert(i, _) | OpI::Memoize(i, _) => {
                let k = key_from(pool, i);
                let fresh = model.insert(k.clone());
                prop_assert_eq!(unique.insert(k.clone()).is_none(), fresh);
                prop_assert_eq!(rigid.insert(k).is_none(), fresh);
            }
            OpI::Update(i, _) | OpI::Edit(i, _) => {
                let k = key_from(pool, i);
                let present = !model.insert(k.clone());
                prop_assert_eq!(unique.update(k.clone()), present.then(|| k.clone()));
                prop_assert_eq!(rigid.update(k.clone()), present.then_some(k));
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                let expected = model.take(&k);
                prop_assert_eq!(unique.remove(&k), expected.clone());
                prop_assert_eq!(rigid.remove(&k), expected);
            }
            OpI::Find(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(unique.get(&k), model.get(&k));
                prop_assert_eq!(rigid.index_of(&k).map(|ix| &rigid[ix]), model.get(&k));
            }
            OpI::Contains(s) => {
                let expected = model.contains(s.as_str());
                prop_assert_eq!(unique.contains(s.as_str()), expected);
                prop_assert_eq!(rigid.contains(s.as_str()), expected);
            }
            OpI::Iterate => {
                let expected: BTreeSet<Key> = model.iter().cloned().collect();
                let got: BTreeSet<Key> = unique.iter().cloned().collect();
                prop_assert_eq!(&got, &expected);
                let got: BTreeSet<Key> = rigid.iter().cloned().collect();
                prop_assert_eq!(&got, &expected);
            }
            OpI::Clear(keep) => {
                if keep {
                    unique.remove_all_keeping_capacity();
                } else {
                    unique.remove_all();
                }
                rigid.remove_all();
                model.clear();
            }
        }

        unique.assert_consistent();
        rigid.assert_consistent();
        prop_assert_eq!(unique.len(), model.len());
        prop_assert_eq!(rigid.len(), model.len());
        prop_assert!(unique.as_rigid() == &rigid);
    }
    Ok(())
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_unique_dictionary((pool, ops) in arb_scenario()) {
        run_unique_dictionary(UniqueDictionary::new(), &pool, ops)?;
    }

    #[test]
    fn prop_rigid_dictionary((pool, ops) in arb_scenario()) {
        let capacity = pool.len();
        run_rigid_dictionary(RigidDictionary::with_capacity(capacity), &pool, ops)?;
    }

    #[test]
    fn prop_sets((pool, ops) in arb_scenario()) {
        let capacity = pool.len();
        run_sets(UniqueSet::new(), RigidSet::with_capacity(capacity), &pool, ops)?;
    }
}

// Same state machines under worst-case collision behavior (constant hasher):
// every key shares one home bucket, so probing, displacement and backward
// shifting all run over a single chain.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_unique_dictionary_with_collisions((pool, ops) in arb_scenario()) {
        run_unique_dictionary(UniqueDictionary::with_hasher(ConstBuildHasher), &pool, ops)?;
    }

    #[test]
    fn prop_rigid_dictionary_with_collisions((pool, ops) in arb_scenario()) {
        let capacity = pool.len();
        run_rigid_dictionary(RigidDictionary::with_capacity_and_hasher(capacity, ConstBuildHasher), &pool, ops)?;
    }

    #[test]
    fn prop_sets_with_collisions((pool, ops) in arb_scenario()) {
        let capacity = pool.len();
        run_sets(
            UniqueSet::with_hasher(ConstBuildHasher),
            RigidSet::with_capacity_and_hasher(capacity, ConstBuildHasher),
            &pool,
            ops,
        )?;
    }
}
