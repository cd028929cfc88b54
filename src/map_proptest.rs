#![cfg(test)]

// Property tests for both backends kept inside the crate so they can read
// backend internals (red-black invariants, table epoch).

use crate::{Added, HashOps, Map, MapError, MapKind, OpsPolicy};
use proptest::prelude::*;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Add(usize, i32),
    Delete(usize),
    Get(usize),
    Step,
    Restart,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Add(i, v)),
            2 => idx.clone().prop_map(OpI::Delete),
            1 => idx.clone().prop_map(OpI::Get),
            3 => Just(OpI::Step),
            1 => Just(OpI::Restart),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// What an in-flight cursor has produced, and what it still owes.
struct CursorModel {
    seen: BTreeSet<String>,
    last: Option<String>,
    /// Keys present when the cursor started and not removed since.
    pending: BTreeSet<String>,
    epoch: Option<u64>,
}

impl CursorModel {
    fn start(map: &Map<'_, str, i32>, model: &BTreeMap<String, i32>) -> Self {
        Self {
            seen: BTreeSet::new(),
            last: None,
            pending: model.keys().cloned().collect(),
            epoch: map.as_hashed().map(|h| h.epoch()),
        }
    }
}

fn epoch_of(map: &Map<'_, str, i32>) -> Option<u64> {
    map.as_hashed().map(|h| h.epoch())
}

fn run(mut sut: Map<'static, str, i32>, pool: Vec<String>, ops: Vec<OpI>) -> Result<(), TestCaseError> {
    let mut model: BTreeMap<String, i32> = BTreeMap::new();
    let mut cursor = sut.travinit();
    let mut cm = CursorModel::start(&sut, &model);

    for op in ops {
        match op {
            OpI::Add(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                match sut.add(k.clone(), Cow::Owned(v)) {
                    Ok(Added::Inserted) => prop_assert!(!already),
                    Ok(Added::Updated) => prop_assert!(already),
                    Err(MapError::AlreadyExists) | Err(MapError::OutOfMemory) => {
                        prop_assert!(false, "unexpected add failure")
                    }
                }
                if !already && sut.kind() == MapKind::Hashed {
                    // A re-added key is a new chain entry.
                    cm.seen.remove(&k);
                }
                model.insert(k, v);
            }
            OpI::Delete(i) => {
                let k = &pool[i];
                let removed = sut.delete(k).map(Cow::into_owned);
                prop_assert_eq!(removed, model.remove(k));
                cm.pending.remove(k);
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            OpI::Step => match sut.traverse(&mut cursor) {
                Some((k, v)) => {
                    prop_assert_eq!(model.get(k), Some(v));
                    prop_assert!(!cm.seen.contains(k), "entry {:?} repeated", k);
                    if sut.kind() == MapKind::Ordered {
                        prop_assert!(cm.last.as_deref().map_or(true, |l| l < k));
                    }
                    cm.seen.insert(k.to_string());
                    cm.pending.remove(k);
                    cm.last = Some(k.to_string());
                }
                None => {
                    prop_assert!(cursor.is_finished());
                    let resized = cm.epoch != epoch_of(&sut);
                    if !resized {
                        prop_assert!(cm.pending.is_empty(), "skipped {:?}", cm.pending);
                    }
                }
            },
            OpI::Restart => {
                cursor = sut.travinit();
                cm = CursorModel::start(&sut, &model);
            }
            OpI::Iterate => {
                let got: Vec<(String, i32)> =
                    sut.iter().map(|(k, v)| (k.to_string(), *v)).collect();
                let got_keys: BTreeSet<&String> = got.iter().map(|(k, _)| k).collect();
                prop_assert_eq!(got_keys.len(), got.len(), "iteration repeated a key");
                if sut.kind() == MapKind::Ordered {
                    let want: Vec<(String, i32)> =
                        model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(got, want);
                } else {
                    prop_assert_eq!(got_keys.len(), model.len());
                }
            }
        }

        if let Some(t) = sut.as_ordered() {
            prop_assert!(t.check_invariants().is_ok(), "{:?}", t.check_invariants());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::BTreeMap,
// with one cursor interleaved with the mutations.
// Invariants exercised across random operation sequences:
// - add/get/delete/len parity with the model.
// - Red-black properties hold after every operation.
// - A tree cursor yields strictly ascending keys, never repeats, and on
//   reaching the end has produced every key that was present throughout.
// - A bucket cursor never repeats and, unless a resize happened, misses
//   nothing that was present throughout.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_ordered_state_machine((pool, ops) in arb_scenario()) {
        run(Map::new_ordered(OpsPolicy::strings(), false), pool, ops)?;
    }

    #[test]
    fn prop_hashed_state_machine((pool, ops) in arb_scenario()) {
        run(Map::new_hashed(HashOps::strings(), false), pool, ops)?;
    }

    #[test]
    fn prop_hashed_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let ops_policy = OpsPolicy::strings().hashed_by(|_| 0);
        run(Map::new_hashed(ops_policy, false), pool, ops)?;
    }
}

// Property: with no_overwrite the first value written for a key wins until
// the key is deleted.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_no_overwrite_keeps_first_value(
        writes in proptest::collection::vec((0u8..16, any::<i32>()), 1..80),
        hashed in any::<bool>(),
    ) {
        let mut sut: Map<'static, str, i32> = if hashed {
            Map::new_hashed(HashOps::strings(), true)
        } else {
            Map::new_ordered(OpsPolicy::strings(), true)
        };
        let mut model: BTreeMap<String, i32> = BTreeMap::new();
        for (k, v) in writes {
            let key = format!("k{k}");
            let res = sut.add(key.clone(), Cow::Owned(v));
            match model.get(&key) {
                Some(_) => prop_assert_eq!(res, Err(MapError::AlreadyExists)),
                None => {
                    prop_assert_eq!(res, Ok(Added::Inserted));
                    model.insert(key.clone(), v);
                }
            }
            prop_assert_eq!(sut.get(&key), model.get(&key));
        }
    }
}
