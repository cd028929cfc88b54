// Cursor traversal test suite.
//
// Invariants exercised:
// - Completeness: without mutation every entry is returned exactly once.
// - Tree cursor under mutation: never repeats, never skips an entry that was
//   present throughout, resumes just after the last key it returned.
// - Bucket cursor under mutation: removals inside the current chain are
//   survived; a resize ends the traversal.
// - Cursors are independent of each other and may be dropped at any point.
use assoc_maps::{Cursor, HashOps, Map, OpsPolicy};
use std::borrow::Cow;
use std::collections::BTreeSet;

fn tree_of(keys: impl IntoIterator<Item = i32>) -> Map<'static, i32, i32> {
    let mut m = Map::new_ordered(OpsPolicy::ordered(), false);
    for k in keys {
        m.add(Cow::Owned(k), Cow::Owned(-k)).unwrap();
    }
    m
}

fn step<'a>(m: &Map<'a, i32, i32>, c: &mut Cursor<'a, i32>) -> Option<i32> {
    m.traverse(c).map(|(k, _)| *k)
}

fn drain<'a>(m: &Map<'a, i32, i32>, c: &mut Cursor<'a, i32>) -> Vec<i32> {
    std::iter::from_fn(|| step(m, c)).collect()
}

fn step_str<'a>(m: &Map<'a, str, str>, c: &mut Cursor<'a, str>) -> Option<String> {
    m.traverse(c).map(|(k, _)| k.to_string())
}

// Test: plain traversal of both backends.
// Verifies: each entry once; tree in ascending order; end is sticky.
#[test]
fn traversal_without_mutation_is_complete() {
    let m = tree_of([5, 3, 9, 1, 7]);
    let mut c = m.travinit();
    assert_eq!(drain(&m, &mut c), vec![1, 3, 5, 7, 9]);
    assert!(c.is_finished());
    assert_eq!(step(&m, &mut c), None);

    let mut h: Map<'_, str, str> = Map::new_hashed(HashOps::strings(), false);
    let words = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];
    for w in words {
        h.add(w, w).unwrap();
    }
    let mut c = h.travinit();
    let mut seen = Vec::new();
    while let Some(k) = step_str(&h, &mut c) {
        seen.push(k);
    }
    let unique: BTreeSet<&str> = seen.iter().map(String::as_str).collect();
    assert_eq!(seen.len(), words.len());
    assert_eq!(unique, words.into_iter().collect());
}

// Test: empty maps.
#[test]
fn empty_map_traversal_ends_immediately() {
    let m = tree_of([]);
    let mut c = m.travinit();
    assert_eq!(step(&m, &mut c), None);
    assert!(c.is_finished());

    let h: Map<'_, str, str> = Map::new_hashed(HashOps::strings(), false);
    let mut c = h.travinit();
    assert!(h.traverse(&mut c).is_none());
}

// Test: delete the entry just returned.
// Verifies: traversal continues at its successor.
#[test]
fn tree_delete_current_entry() {
    let mut m = tree_of((1..=10).map(|i| i * 10));
    let mut c = m.travinit();
    for want in [10, 20, 30, 40, 50] {
        assert_eq!(step(&m, &mut c), Some(want));
    }
    assert_eq!(m.delete(&50).as_deref(), Some(&-50));
    assert_eq!(drain(&m, &mut c), vec![60, 70, 80, 90, 100]);
}

// Test: delete entries already returned.
// Verifies: nothing is repeated and nothing ahead is skipped.
#[test]
fn tree_delete_visited_entries() {
    let mut m = tree_of((1..=10).map(|i| i * 10));
    let mut c = m.travinit();
    for _ in 0..5 {
        step(&m, &mut c);
    }
    for k in [10, 20, 30, 40] {
        m.delete(&k).unwrap();
    }
    assert_eq!(drain(&m, &mut c), vec![60, 70, 80, 90, 100]);
}

// Test: delete entries not yet returned, including the precomputed next.
// Verifies: deleted entries are never returned; the rest still are.
#[test]
fn tree_delete_unvisited_entries() {
    let mut m = tree_of((1..=10).map(|i| i * 10));
    let mut c = m.travinit();
    for _ in 0..5 {
        step(&m, &mut c);
    }
    m.delete(&60).unwrap();
    m.delete(&90).unwrap();
    assert_eq!(drain(&m, &mut c), vec![70, 80, 100]);
}

// Test: insert during traversal.
// Verifies: keys above the position are returned; keys below are not.
#[test]
fn tree_insert_during_traversal() {
    let mut m = tree_of((1..=10).map(|i| i * 10));
    let mut c = m.travinit();
    for _ in 0..5 {
        step(&m, &mut c);
    }
    m.add(Cow::Owned(55), Cow::Owned(0)).unwrap();
    m.add(Cow::Owned(15), Cow::Owned(0)).unwrap();
    m.add(Cow::Owned(1000), Cow::Owned(0)).unwrap();
    assert_eq!(drain(&m, &mut c), vec![55, 60, 70, 80, 90, 100, 1000]);
}

// Test: update of an existing key is not structural.
// Verifies: cursor continues without re-seeking and sees the new value.
#[test]
fn tree_update_during_traversal() {
    let mut m = tree_of([1, 2, 3]);
    let mut c = m.travinit();
    assert_eq!(step(&m, &mut c), Some(1));
    let before = m.transactions();
    m.add(Cow::Owned(2), Cow::Owned(200)).unwrap();
    assert_eq!(m.transactions(), before);
    assert_eq!(m.traverse(&mut c), Some((&2, &200)));
}

// Test: everything deleted mid-traversal, then refilled.
// Verifies: the cursor resumes above its checkpoint only.
#[test]
fn tree_cursor_survives_clear() {
    let mut m = tree_of([1, 2, 3, 4]);
    let mut c = m.travinit();
    step(&m, &mut c);
    step(&m, &mut c);
    m.clear();
    m.add(Cow::Owned(1), Cow::Owned(0)).unwrap();
    m.add(Cow::Owned(7), Cow::Owned(0)).unwrap();
    assert_eq!(drain(&m, &mut c), vec![7]);
}

// Test: two cursors over one tree, interleaved with a deletion.
// Verifies: each cursor keeps its own position.
#[test]
fn independent_cursors() {
    let mut m = tree_of(1..=6);
    let mut a = m.travinit();
    let mut b = m.travinit();
    assert_eq!(step(&m, &mut a), Some(1));
    assert_eq!(step(&m, &mut a), Some(2));
    assert_eq!(step(&m, &mut a), Some(3));
    assert_eq!(step(&m, &mut b), Some(1));
    m.delete(&2).unwrap();
    assert_eq!(step(&m, &mut b), Some(3));
    assert_eq!(drain(&m, &mut a), vec![4, 5, 6]);
    assert_eq!(drain(&m, &mut b), vec![4, 5, 6]);
}

// Test: abandoning a traversal.
// Verifies: a released cursor leaves the map untouched.
#[test]
fn travfree_cancels_traversal() {
    let mut m = tree_of(1..=4);
    let mut c = m.travinit();
    step(&m, &mut c);
    c.travfree();
    m.delete(&1).unwrap();
    assert_eq!(m.len(), 3);
    let mut fresh = m.travinit();
    assert_eq!(drain(&m, &mut fresh), vec![2, 3, 4]);
}

// Test: delete the current entry on every step of a single-chain table.
// Assumes: 8 keys stay under the first growth threshold; the smallest
// table never shrinks.
// Verifies: every key is still returned, in insertion order.
#[test]
fn bucket_cursor_survives_deleting_current_entry() {
    let mut h: Map<'_, str, str> =
        Map::new_hashed(HashOps::strings().with_hash(|_| 7), false);
    let keys: Vec<String> = (0..8).map(|i| format!("k{i}")).collect();
    for k in &keys {
        h.add(k.clone(), "v").unwrap();
    }
    let epoch = h.as_hashed().unwrap().epoch();
    let mut c = h.travinit();
    let mut seen = Vec::new();
    while let Some(k) = step_str(&h, &mut c) {
        assert!(h.delete(&k).is_some());
        seen.push(k);
    }
    assert_eq!(h.as_hashed().unwrap().epoch(), epoch);
    assert_eq!(seen, keys);
    assert!(h.is_empty());
}

// Test: delete entries ahead of a bucket cursor.
// Verifies: deleted keys are not returned; every other key is, once.
#[test]
fn bucket_cursor_skips_deleted_entries() {
    let mut h: Map<'_, str, str> = Map::new_hashed(HashOps::strings(), false);
    let keys: Vec<String> = (0..8).map(|i| format!("w{i}")).collect();
    for k in &keys {
        h.add(k.clone(), "v").unwrap();
    }
    let mut c = h.travinit();
    let first = step_str(&h, &mut c).unwrap();
    let doomed: Vec<&String> = keys.iter().filter(|k| **k != first).take(3).collect();
    for k in &doomed {
        h.delete(k).unwrap();
    }
    let mut seen = vec![first];
    while let Some(k) = step_str(&h, &mut c) {
        seen.push(k);
    }
    let seen_set: BTreeSet<&String> = seen.iter().collect();
    assert_eq!(seen_set.len(), seen.len());
    let expected: BTreeSet<&String> = keys.iter().filter(|k| !doomed.contains(k)).collect();
    assert_eq!(seen_set, expected);
}

// Test: resize while a bucket cursor is in flight.
// Assumes: the 10th key grows the 13-bucket table.
// Verifies: the traversal ends instead of returning stale positions.
#[test]
fn bucket_cursor_ends_after_resize() {
    let mut h: Map<'_, str, str> = Map::new_hashed(HashOps::strings(), false);
    for i in 0..8 {
        h.add(format!("r{i}"), "v").unwrap();
    }
    let mut c = h.travinit();
    assert!(step_str(&h, &mut c).is_some());
    h.add("r8", "v").unwrap();
    h.add("r9", "v").unwrap();
    assert_eq!(h.as_hashed().unwrap().epoch(), 1);
    assert_eq!(step_str(&h, &mut c), None);
    assert!(c.is_finished());
}

// Test: IntoIterator for &Map.
#[test]
fn for_loop_over_map() {
    let m = tree_of([3, 1, 2]);
    let mut sum = 0;
    for (k, v) in &m {
        assert_eq!(*v, -*k);
        sum += k;
    }
    assert_eq!(sum, 6);
}
