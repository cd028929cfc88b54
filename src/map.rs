//! Map: one handle over either backend.

use core::fmt;
use std::borrow::Cow;

use crate::cursor::{Cursor, CursorState};
use crate::error::{Added, Result};
use crate::hash_table::HashTable;
use crate::policy::{HashOps, OpsPolicy};
use crate::tree::TreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Ordered,
    Hashed,
}

/// An associative container backed by a red-black tree or a bucket table.
///
/// Keys and values are stored as `Cow<'a, _>`: borrowed inputs stay
/// borrowed unless the policy duplicates them, owned inputs are moved in.
///
/// ```
/// use assoc_maps::{Added, Map, OpsPolicy};
///
/// let mut m: Map<'_, str, str> = Map::new_ordered(OpsPolicy::strings(), false);
/// assert_eq!(m.add("b", "two"), Ok(Added::Inserted));
/// assert_eq!(m.add("a", "one"), Ok(Added::Inserted));
/// assert_eq!(m.get("a"), Some("one"));
///
/// let keys: Vec<&str> = m.iter().map(|(k, _)| k).collect();
/// assert_eq!(keys, ["a", "b"]);
/// ```
pub enum Map<'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> {
    Ordered(TreeMap<'a, K, V>),
    Hashed(HashTable<'a, K, V>),
}

impl<'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> Map<'a, K, V> {
    pub fn new_ordered(policy: OpsPolicy<K, V>, no_overwrite: bool) -> Self {
        Map::Ordered(TreeMap::new(policy, no_overwrite))
    }

    pub fn new_hashed(policy: HashOps<K, V>, no_overwrite: bool) -> Self {
        Map::Hashed(HashTable::new(policy, no_overwrite))
    }

    pub fn kind(&self) -> MapKind {
        match self {
            Map::Ordered(_) => MapKind::Ordered,
            Map::Hashed(_) => MapKind::Hashed,
        }
    }

    pub fn as_ordered(&self) -> Option<&TreeMap<'a, K, V>> {
        match self {
            Map::Ordered(t) => Some(t),
            Map::Hashed(_) => None,
        }
    }

    pub fn as_hashed(&self) -> Option<&HashTable<'a, K, V>> {
        match self {
            Map::Hashed(h) => Some(h),
            Map::Ordered(_) => None,
        }
    }

    /// Insert `key` with `value`, or replace the value of an existing key.
    ///
    /// Fails with `AlreadyExists` on an existing key when the map was built
    /// with `no_overwrite`, and with `OutOfMemory` when no entry can be
    /// created. The map is unchanged on failure.
    pub fn add(
        &mut self,
        key: impl Into<Cow<'a, K>>,
        value: impl Into<Cow<'a, V>>,
    ) -> Result<Added> {
        let (key, value) = (key.into(), value.into());
        match self {
            Map::Ordered(t) => t.insert(key, value),
            Map::Hashed(h) => h.insert(key, value),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        match self {
            Map::Ordered(t) => t.get(key),
            Map::Hashed(h) => h.get(key),
        }
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        match self {
            Map::Ordered(t) => t.get_key_value(key),
            Map::Hashed(h) => h.get_key_value(key),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Remove `key` and hand back its value; `None` if it was absent.
    pub fn delete(&mut self, key: &K) -> Option<Cow<'a, V>> {
        match self {
            Map::Ordered(t) => t.remove(key),
            Map::Hashed(h) => h.remove(key),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Map::Ordered(t) => t.len(),
            Map::Hashed(h) => h.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn transactions(&self) -> u64 {
        match self {
            Map::Ordered(t) => t.transactions(),
            Map::Hashed(h) => h.transactions(),
        }
    }

    /// Release every entry; returns how many were released.
    pub fn clear(&mut self) -> usize {
        match self {
            Map::Ordered(t) => t.clear(),
            Map::Hashed(h) => h.clear(),
        }
    }

    /// Release every entry and the map itself.
    pub fn free(mut self) -> usize {
        match &mut self {
            Map::Ordered(t) => t.destroy(),
            Map::Hashed(h) => h.destroy(),
        }
    }

    /// Start a traversal: key order for the tree, bucket order for the table.
    pub fn travinit(&self) -> Cursor<'a, K> {
        match self {
            Map::Ordered(t) => Cursor::tree(t.cursor()),
            Map::Hashed(h) => Cursor::bucket(h.cursor()),
        }
    }

    /// Next entry for `cursor`, or `None` at the end.
    ///
    /// The map may be mutated between calls. On the tree, entries are
    /// never repeated and entries present throughout are never skipped. On
    /// the table, the traversal ends early after a resize. A cursor from a
    /// different backend kind ends immediately.
    pub fn traverse<'m>(&'m self, cursor: &mut Cursor<'a, K>) -> Option<(&'m K, &'m V)> {
        let next = match (self, &mut cursor.state) {
            (Map::Ordered(t), CursorState::Tree(c)) => t.step(c),
            (Map::Hashed(h), CursorState::Bucket(c)) => h.step(c),
            _ => None,
        };
        if next.is_none() {
            cursor.finish();
        }
        next
    }

    pub fn iter(&self) -> Iter<'_, 'a, K, V> {
        Iter {
            map: self,
            cursor: self.travinit(),
        }
    }
}

/// Borrowing iterator driven by a [`Cursor`].
pub struct Iter<'m, 'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> {
    map: &'m Map<'a, K, V>,
    cursor: Cursor<'a, K>,
}

impl<'m, 'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> Iterator for Iter<'m, 'a, K, V> {
    type Item = (&'m K, &'m V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.map.traverse(&mut self.cursor)
    }
}

impl<'m, 'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> IntoIterator for &'m Map<'a, K, V> {
    type Item = (&'m K, &'m V);
    type IntoIter = Iter<'m, 'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> fmt::Debug for Map<'a, K, V>
where
    K: ?Sized + ToOwned + fmt::Debug,
    V: ?Sized + ToOwned + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
