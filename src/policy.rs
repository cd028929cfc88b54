//! Ops policies: the comparator, duplication and hash functions that
//! parameterize how a map handles its keys and values.
//!
//! A policy is plain data (function pointers only) fixed at construction.
//! Releasing an owned key or value is its `Drop`; borrowed entries are
//! never released by the map.

use core::cmp::Ordering;
use core::fmt;
use core::hash::Hash;
use std::borrow::Cow;

use crate::hash::{hash_opaque, hash_str};

/// Whether a map stores copies of what it is given or the caller's borrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Borrowed inputs are duplicated on insert; the map releases them.
    Owned,
    /// Borrowed inputs are stored as-is; the caller outlives the entry.
    Borrowed,
}

pub struct OpsPolicy<K: ?Sized + ToOwned, V: ?Sized + ToOwned> {
    compare: fn(&K, &K) -> Ordering,
    key_dup: Option<fn(&K) -> K::Owned>,
    data_dup: Option<fn(&V) -> V::Owned>,
}

impl<K: ?Sized + ToOwned, V: ?Sized + ToOwned> OpsPolicy<K, V> {
    /// Policy with a custom comparator that borrows keys and values.
    pub fn new(compare: fn(&K, &K) -> Ordering) -> Self {
        Self {
            compare,
            key_dup: None,
            data_dup: None,
        }
    }

    /// Copy borrowed keys on insert with `ToOwned`.
    pub fn dup_keys(self) -> Self {
        self.with_key_dup(<K as ToOwned>::to_owned)
    }

    /// Copy borrowed values on insert with `ToOwned`.
    pub fn dup_data(self) -> Self {
        self.with_data_dup(<V as ToOwned>::to_owned)
    }

    pub fn with_key_dup(mut self, dup: fn(&K) -> K::Owned) -> Self {
        self.key_dup = Some(dup);
        self
    }

    pub fn with_data_dup(mut self, dup: fn(&V) -> V::Owned) -> Self {
        self.data_dup = Some(dup);
        self
    }

    /// Extend this policy with a hash function for the bucket table.
    pub fn hashed_by(self, hash: fn(&K) -> u64) -> HashOps<K, V> {
        HashOps { ops: self, hash }
    }

    pub fn key_ownership(&self) -> Ownership {
        if self.key_dup.is_some() {
            Ownership::Owned
        } else {
            Ownership::Borrowed
        }
    }

    pub fn data_ownership(&self) -> Ownership {
        if self.data_dup.is_some() {
            Ownership::Owned
        } else {
            Ownership::Borrowed
        }
    }

    #[inline]
    pub(crate) fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.compare)(a, b)
    }

    /// Take a key into storage: borrows are copied when the policy owns keys.
    pub(crate) fn adopt_key<'a>(&self, key: Cow<'a, K>) -> Cow<'a, K> {
        match (key, self.key_dup) {
            (Cow::Borrowed(k), Some(dup)) => Cow::Owned(dup(k)),
            (key, _) => key,
        }
    }

    pub(crate) fn adopt_data<'a>(&self, value: Cow<'a, V>) -> Cow<'a, V> {
        match (value, self.data_dup) {
            (Cow::Borrowed(v), Some(dup)) => Cow::Owned(dup(v)),
            (value, _) => value,
        }
    }

    /// Copy of a stored key for a cursor checkpoint: a stored borrow is
    /// re-borrowed, a stored copy is copied again.
    pub(crate) fn checkpoint<'a>(&self, stored: &Cow<'a, K>) -> Cow<'a, K> {
        match stored {
            Cow::Borrowed(k) => Cow::Borrowed(*k),
            Cow::Owned(k) => {
                let k: &K = core::borrow::Borrow::borrow(k);
                Cow::Owned(match self.key_dup {
                    Some(dup) => dup(k),
                    None => K::to_owned(k),
                })
            }
        }
    }
}

impl<K: ?Sized + ToOwned + Ord, V: ?Sized + ToOwned> OpsPolicy<K, V> {
    /// Policy ordering keys by their `Ord` impl, borrowing everything.
    pub fn ordered() -> Self {
        Self::new(<K as Ord>::cmp)
    }
}

impl<K: ?Sized + ToOwned + Ord + Hash, V: ?Sized + ToOwned> OpsPolicy<K, V> {
    /// `ordered()` plus the opaque-key hash family.
    pub fn hashed() -> HashOps<K, V> {
        Self::ordered().hashed_by(hash_opaque::<K>)
    }
}

impl<V: ?Sized + ToOwned> OpsPolicy<str, V> {
    /// String keys, copied on insert.
    pub fn strings() -> Self {
        Self::new(<str as Ord>::cmp).dup_keys()
    }
}

impl<K: ?Sized + ToOwned, V: ?Sized + ToOwned> Clone for OpsPolicy<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: ?Sized + ToOwned, V: ?Sized + ToOwned> Copy for OpsPolicy<K, V> {}

impl<K: ?Sized + ToOwned, V: ?Sized + ToOwned> fmt::Debug for OpsPolicy<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpsPolicy")
            .field("keys", &self.key_ownership())
            .field("data", &self.data_ownership())
            .finish()
    }
}

/// An [`OpsPolicy`] extended with the hash function the bucket table needs.
pub struct HashOps<K: ?Sized + ToOwned, V: ?Sized + ToOwned> {
    pub(crate) ops: OpsPolicy<K, V>,
    hash: fn(&K) -> u64,
}

impl<K: ?Sized + ToOwned, V: ?Sized + ToOwned> HashOps<K, V> {
    pub fn ops(&self) -> &OpsPolicy<K, V> {
        &self.ops
    }

    /// Replace the hash function, keeping the rest of the policy.
    pub fn with_hash(mut self, hash: fn(&K) -> u64) -> Self {
        self.hash = hash;
        self
    }

    pub fn dup_keys(mut self) -> Self {
        self.ops = self.ops.dup_keys();
        self
    }

    pub fn dup_data(mut self) -> Self {
        self.ops = self.ops.dup_data();
        self
    }

    #[inline]
    pub(crate) fn hash(&self, key: &K) -> u64 {
        (self.hash)(key)
    }
}

impl<V: ?Sized + ToOwned> HashOps<str, V> {
    /// String keys, copied on insert, hashed with [`hash_str`].
    pub fn strings() -> Self {
        OpsPolicy::strings().hashed_by(hash_str)
    }
}

impl<K: ?Sized + ToOwned, V: ?Sized + ToOwned> Clone for HashOps<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: ?Sized + ToOwned, V: ?Sized + ToOwned> Copy for HashOps<K, V> {}

impl<K: ?Sized + ToOwned, V: ?Sized + ToOwned> fmt::Debug for HashOps<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashOps").field("ops", &self.ops).finish()
    }
}
