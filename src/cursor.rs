//! Detached traversal cursors.
//!
//! A cursor does not borrow its map, so the map may be mutated between
//! steps. Each cursor snapshots the counter its backend uses to detect
//! staleness:
//! - tree cursors re-derive their position from a checkpoint key when the
//!   tree changed shape;
//! - bucket cursors end the traversal once the table has been resized.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::borrow::Cow;

use crate::hash_table::EntryId;
use crate::tree::{NodeId, Path};

/// Identity of one map instance. A cursor only steps the map that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MapId(u64);

impl MapId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        MapId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) struct TreeCursor<'a, K: ?Sized + ToOwned> {
    pub(crate) owner: MapId,
    /// Ancestors of `next`.
    pub(crate) path: Path,
    pub(crate) next: Option<NodeId>,
    /// Key of the entry returned last.
    pub(crate) checkpoint: Option<Cow<'a, K>>,
    pub(crate) transactions: u64,
    pub(crate) finished: bool,
}

impl<'a, K: ?Sized + ToOwned> TreeCursor<'a, K> {
    pub(crate) fn new(owner: MapId, path: Path, next: Option<NodeId>, transactions: u64) -> Self {
        Self {
            owner,
            path,
            next,
            checkpoint: None,
            transactions,
            finished: false,
        }
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
        self.path = Path::new();
        self.next = None;
        self.checkpoint = None;
    }
}

pub(crate) struct BucketCursor {
    pub(crate) owner: MapId,
    pub(crate) bucket: usize,
    /// Entry returned last in `bucket` and its chain sequence number.
    pub(crate) last: Option<(EntryId, u64)>,
    pub(crate) epoch: u64,
    pub(crate) finished: bool,
}

impl BucketCursor {
    pub(crate) fn new(owner: MapId, epoch: u64) -> Self {
        Self {
            owner,
            bucket: 0,
            last: None,
            epoch,
            finished: false,
        }
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
        self.last = None;
    }
}

pub(crate) enum CursorState<'a, K: ?Sized + ToOwned> {
    Tree(TreeCursor<'a, K>),
    Bucket(BucketCursor),
}

/// Restartable position within a [`Map`](crate::Map).
///
/// Obtained from `Map::travinit` and advanced with `Map::traverse`.
/// Dropping a cursor (or calling [`Cursor::travfree`]) at any point is
/// safe and leaves the map untouched.
pub struct Cursor<'a, K: ?Sized + ToOwned> {
    pub(crate) state: CursorState<'a, K>,
}

impl<'a, K: ?Sized + ToOwned> Cursor<'a, K> {
    pub(crate) fn tree(cursor: TreeCursor<'a, K>) -> Self {
        Self {
            state: CursorState::Tree(cursor),
        }
    }

    pub(crate) fn bucket(cursor: BucketCursor) -> Self {
        Self {
            state: CursorState::Bucket(cursor),
        }
    }

    /// True once the cursor has reported the end of the traversal.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            CursorState::Tree(c) => c.finished,
            CursorState::Bucket(c) => c.finished,
        }
    }

    pub(crate) fn finish(&mut self) {
        match &mut self.state {
            CursorState::Tree(c) => c.finish(),
            CursorState::Bucket(c) => c.finish(),
        }
    }

    /// Release the cursor and its checkpoint.
    pub fn travfree(self) {}
}

impl<'a, K: ?Sized + ToOwned + fmt::Debug> fmt::Debug for Cursor<'a, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            CursorState::Tree(c) => f
                .debug_struct("Cursor::Tree")
                .field("checkpoint", &c.checkpoint.as_deref())
                .field("transactions", &c.transactions)
                .field("finished", &c.finished)
                .finish(),
            CursorState::Bucket(c) => f
                .debug_struct("Cursor::Bucket")
                .field("bucket", &c.bucket)
                .field("epoch", &c.epoch)
                .field("finished", &c.finished)
                .finish(),
        }
    }
}
