//! assoc-maps: an ordered map (red-black tree) and a hashed map (prime
//! bucket table) behind one handle, with cursors that keep working while
//! the map is mutated.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: let callers pick ordered or hashed storage without changing
//!   call sites, and walk either with a cursor that tolerates inserts and
//!   removals between steps.
//! - Layers:
//!   - OpsPolicy / HashOps: comparator, optional duplication functions and
//!     (for the table) a hash function. Plain function pointers, fixed at
//!     construction.
//!   - TreeMap<K, V>: red-black tree in a slot arena. No parent links; each
//!     mutation records its descent path and rebalances along it.
//!   - HashTable<K, V>: bucket array sized from a table of primes, chains
//!     linked through a slot arena, grown at 70% load and shrunk below 25%.
//!   - Map<K, V>: sum type over the two backends; every operation matches
//!     on the variant and forwards.
//!   - Cursor<K>: detached position. Holds no borrow of the map, only arena
//!     ids, the issuing map's identity and the counter value it last
//!     synchronized with. A cursor stepped on any other map ends.
//!
//! Constraints
//! - Single-threaded: a map and its cursors need external locking to be
//!   shared; the transaction counters are staleness markers, not locks.
//! - Keys and values are `Cow<'a, _>`. The policy decides whether borrowed
//!   inputs are duplicated (owned) or kept as borrows that must outlive the
//!   map (enforced by `'a`). Releasing an entry is dropping it.
//! - Failed inserts leave the map unchanged.
//!
//! Cursor contract
//! - Tree: every structural change bumps `transactions`. A cursor that sees
//!   a newer value discards its recorded path and descends again from the
//!   root, resuming just after its checkpoint key (the key it returned
//!   last). It never repeats an entry, never skips an entry present before
//!   and after the mutation, and never touches a freed node.
//! - Table: a resize bumps `epoch`. A cursor that sees a newer epoch ends
//!   the traversal. Removals inside the current chain are handled through
//!   per-chain sequence numbers.
//!
//! Hashing
//! - Hash functions are pure functions of the key; nothing is seeded per
//!   process or per map, so relinking on resize is deterministic. Each
//!   entry caches its hash so resizing never calls back into the policy.
//!
//! Diagnostics
//! - The maps never log. `TreeMap::check_invariants` verifies the
//!   red-black properties; `HashTable` exposes its bucket count, load
//!   thresholds and chain lengths.

mod cursor;
mod error;
pub mod hash;
pub mod hash_table;
mod map;
mod map_proptest;
mod policy;
pub mod tree;

// Public surface
pub use cursor::Cursor;
pub use error::{Added, MapError, Result};
pub use hash_table::HashTable;
pub use map::{Iter, Map, MapKind};
pub use policy::{HashOps, OpsPolicy, Ownership};
pub use tree::{Color, TreeMap, Violation};
