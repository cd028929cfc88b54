//! HashTable: prime-sized bucket array of chains over a slot arena.
//!
//! Chains are doubly linked through the arena and appended at the tail,
//! so a chain lists its entries in insertion order. Every entry carries a
//! sequence number that increases along its chain; resizing renumbers
//! entries as it relinks them. A bucket cursor uses that number to find
//! its place again after entries of its current chain were removed.

use core::cmp::Ordering;
use std::borrow::Cow;

use slotmap::{new_key_type, SlotMap};

use crate::cursor::{BucketCursor, MapId};
use crate::error::{Added, MapError, Result, MAX_ENTRIES};
use crate::policy::HashOps;

new_key_type! {
    pub(crate) struct EntryId;
}

/// Bucket counts, ascending. Each is prime and sits far from powers of two.
pub const PRIMES: [usize; 28] = [
    13, 29, 53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613, 393241,
    786433, 1572869, 3145739, 6291469, 12582917, 25165843, 50331653, 100663319, 201326611,
    402653189, 805306457, 1610612741,
];

/// Grow/shrink thresholds for a bucket count index: `(max_load, min_load)`.
fn thresholds(power: usize) -> (usize, usize) {
    let buckets = PRIMES[power];
    let min = if power == 0 { 0 } else { buckets / 4 };
    // 70% without forming `buckets * 7`, which overflows 32-bit usize.
    (buckets / 10 * 7 + buckets % 10 * 7 / 10, min)
}

struct Entry<'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> {
    prev: Option<EntryId>,
    next: Option<EntryId>,
    hash: u64,
    seq: u64,
    key: Cow<'a, K>,
    value: Cow<'a, V>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Chain {
    head: Option<EntryId>,
    tail: Option<EntryId>,
}

pub struct HashTable<'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> {
    id: MapId,
    entries: SlotMap<EntryId, Entry<'a, K, V>>,
    buckets: Vec<Chain>,
    power: usize,
    max_load: usize,
    min_load: usize,
    next_seq: u64,
    transactions: u64,
    epoch: u64,
    ops: HashOps<K, V>,
    no_overwrite: bool,
}

impl<'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> HashTable<'a, K, V> {
    pub fn new(ops: HashOps<K, V>, no_overwrite: bool) -> Self {
        let (max_load, min_load) = thresholds(0);
        Self {
            id: MapId::fresh(),
            entries: SlotMap::with_key(),
            buckets: vec![Chain::default(); PRIMES[0]],
            power: 0,
            max_load,
            min_load,
            next_seq: 0,
            transactions: 0,
            epoch: 0,
            ops,
            no_overwrite,
        }
    }

    pub fn ops(&self) -> &HashOps<K, V> {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Current `(max_load, min_load)` thresholds.
    pub fn load(&self) -> (usize, usize) {
        (self.max_load, self.min_load)
    }

    /// Count of structural changes: new keys, removals and resizes.
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    /// Count of resizes; bucket cursors are only valid within one epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline]
    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    fn find(&self, key: &K, hash: u64) -> Option<EntryId> {
        let mut cur = self.buckets[self.bucket_of(hash)].head;
        while let Some(id) = cur {
            let e = &self.entries[id];
            if e.hash == hash && self.ops.ops.compare(key, &e.key) == Ordering::Equal {
                return Some(id);
            }
            cur = e.next;
        }
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let hash = self.ops.hash(key);
        self.find(key, hash).map(|id| &*self.entries[id].value)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let hash = self.ops.hash(key);
        self.find(key, hash).map(|id| {
            let e = &self.entries[id];
            (&*e.key, &*e.value)
        })
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Link `id` at the tail of its bucket's chain with a fresh sequence number.
    fn append(&mut self, id: EntryId) {
        let bucket = self.bucket_of(self.entries[id].hash);
        let seq = self.next_seq;
        self.next_seq += 1;
        let tail = self.buckets[bucket].tail;
        let e = &mut self.entries[id];
        e.prev = tail;
        e.next = None;
        e.seq = seq;
        match tail {
            Some(tail) => self.entries[tail].next = Some(id),
            None => self.buckets[bucket].head = Some(id),
        }
        self.buckets[bucket].tail = Some(id);
    }

    fn unlink(&mut self, id: EntryId) {
        let e = &self.entries[id];
        let (prev, next, bucket) = (e.prev, e.next, self.bucket_of(e.hash));
        match prev {
            Some(prev) => self.entries[prev].next = next,
            None => self.buckets[bucket].head = next,
        }
        match next {
            Some(next) => self.entries[next].prev = prev,
            None => self.buckets[bucket].tail = prev,
        }
    }

    /// Rebuild the bucket array at `PRIMES[power]` and relink every entry.
    ///
    /// Fails only when the new array cannot be allocated, in which case the
    /// table is left as it was.
    fn resize(&mut self, power: usize) -> Result<()> {
        let count = PRIMES[power];
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(count)
            .map_err(|_| MapError::OutOfMemory)?;
        buckets.resize(count, Chain::default());

        let old = core::mem::replace(&mut self.buckets, buckets);
        self.power = power;
        (self.max_load, self.min_load) = thresholds(power);
        for chain in old {
            let mut cur = chain.head;
            while let Some(id) = cur {
                cur = self.entries[id].next;
                self.append(id);
            }
        }
        self.epoch += 1;
        self.transactions += 1;
        Ok(())
    }

    /// Move one step along the prime table if the load calls for it.
    fn rebalance(&mut self) {
        let len = self.entries.len();
        let target = if len >= self.max_load && self.power + 1 < PRIMES.len() {
            self.power + 1
        } else if len < self.min_load && self.power > 0 {
            self.power - 1
        } else {
            return;
        };
        // A failed resize leaves the current table in place; the load
        // check runs again on the next mutation.
        let _ = self.resize(target);
    }

    /// Insert `key`, or replace the value stored under it.
    pub fn insert(&mut self, key: Cow<'a, K>, value: Cow<'a, V>) -> Result<Added> {
        let hash = self.ops.hash(&key);
        if let Some(id) = self.find(&key, hash) {
            if self.no_overwrite {
                return Err(MapError::AlreadyExists);
            }
            let value = self.ops.ops.adopt_data(value);
            drop(core::mem::replace(&mut self.entries[id].value, value));
            return Ok(Added::Updated);
        }
        if self.entries.len() >= MAX_ENTRIES {
            return Err(MapError::OutOfMemory);
        }

        self.rebalance();
        let id = self.entries.insert(Entry {
            prev: None,
            next: None,
            hash,
            seq: 0,
            key: self.ops.ops.adopt_key(key),
            value: self.ops.ops.adopt_data(value),
        });
        self.append(id);
        self.transactions += 1;
        Ok(Added::Inserted)
    }

    /// Remove `key`, returning its value. May shrink the bucket array.
    pub fn remove(&mut self, key: &K) -> Option<Cow<'a, V>> {
        let hash = self.ops.hash(key);
        let id = self.find(key, hash)?;
        self.unlink(id);
        let entry = self.entries.remove(id)?;
        self.transactions += 1;
        if self.entries.len() < self.min_load {
            self.rebalance();
        }
        Some(entry.value)
    }

    /// Release every entry, bucket by bucket along each chain.
    pub(crate) fn destroy(&mut self) -> usize {
        let mut released = 0;
        for b in 0..self.buckets.len() {
            let mut cur = self.buckets[b].head.take();
            self.buckets[b].tail = None;
            while let Some(id) = cur {
                cur = self.entries.remove(id).and_then(|e| e.next);
                released += 1;
            }
        }
        debug_assert!(self.entries.is_empty());
        if released > 0 {
            self.transactions += 1;
        }
        released
    }

    /// Remove every entry and return to the smallest table.
    pub fn clear(&mut self) -> usize {
        let released = self.destroy();
        if self.power > 0 {
            let _ = self.resize(0);
        }
        released
    }

    pub(crate) fn cursor(&self) -> BucketCursor {
        BucketCursor::new(self.id, self.epoch)
    }

    /// First entry of the chain in `bucket` numbered after `seq`.
    fn first_after(&self, bucket: usize, seq: u64) -> Option<EntryId> {
        let mut cur = self.buckets[bucket].head;
        while let Some(id) = cur {
            let e = &self.entries[id];
            if e.seq > seq {
                return Some(id);
            }
            cur = e.next;
        }
        None
    }

    /// Advance `cursor` one entry in bucket order.
    ///
    /// After a resize bucket positions mean nothing, so the traversal ends
    /// instead of risking repeats or gaps.
    pub(crate) fn step<'m>(&'m self, cursor: &mut BucketCursor) -> Option<(&'m K, &'m V)> {
        if cursor.finished {
            return None;
        }
        if cursor.owner != self.id
            || cursor.epoch != self.epoch
            || cursor.bucket >= self.buckets.len()
        {
            cursor.finish();
            return None;
        }
        let mut cand = match cursor.last {
            None => self.buckets[cursor.bucket].head,
            Some((id, seq)) => match self.entries.get(id) {
                Some(e) => e.next,
                None => self.first_after(cursor.bucket, seq),
            },
        };
        loop {
            if let Some(id) = cand {
                let e = &self.entries[id];
                cursor.last = Some((id, e.seq));
                return Some((&*e.key, &*e.value));
            }
            cursor.bucket += 1;
            cursor.last = None;
            if cursor.bucket >= self.buckets.len() {
                cursor.finish();
                return None;
            }
            cand = self.buckets[cursor.bucket].head;
        }
    }

    /// Entries per bucket, for load inspection.
    pub fn chain_lengths(&self) -> Vec<usize> {
        self.buckets
            .iter()
            .map(|chain| {
                let mut n = 0;
                let mut cur = chain.head;
                while let Some(id) = cur {
                    n += 1;
                    cur = self.entries[id].next;
                }
                n
            })
            .collect()
    }
}
