//! TreeMap: red-black tree over a slot arena.
//!
//! Nodes carry no parent link. Every mutation records the descent as a
//! path of `(ancestor, direction taken)` pairs and rebalances by walking
//! that path back up. Nodes are addressed by generational arena keys, so a
//! stale id held across a removal resolves to nothing instead of aliasing
//! a newer node.

use core::cmp::Ordering;
use std::borrow::Cow;

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::cursor::{MapId, TreeCursor};
use crate::error::{Added, MapError, Result, MAX_ENTRIES};
use crate::policy::OpsPolicy;

new_key_type! {
    pub(crate) struct NodeId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dir {
    Left,
    Right,
}

impl Dir {
    #[inline]
    fn flip(self) -> Dir {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// Ancestors of a position, root first, with the branch taken at each.
pub(crate) type Path = Vec<(NodeId, Dir)>;

struct Node<'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> {
    left: Option<NodeId>,
    right: Option<NodeId>,
    color: Color,
    key: Cow<'a, K>,
    value: Cow<'a, V>,
}

impl<'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> Node<'a, K, V> {
    #[inline]
    fn child(&self, dir: Dir) -> Option<NodeId> {
        match dir {
            Dir::Left => self.left,
            Dir::Right => self.right,
        }
    }

    #[inline]
    fn child_mut(&mut self, dir: Dir) -> &mut Option<NodeId> {
        match dir {
            Dir::Left => &mut self.left,
            Dir::Right => &mut self.right,
        }
    }
}

/// A red-black invariant found broken by [`TreeMap::check_invariants`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    #[error("root is red")]
    RedRoot,
    #[error("red node has a red child")]
    RedRed,
    #[error("black height differs between paths")]
    BlackHeight,
    #[error("keys out of order")]
    Order,
    #[error("reachable nodes do not match the item count")]
    Count,
}

pub struct TreeMap<'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> {
    id: MapId,
    nodes: SlotMap<NodeId, Node<'a, K, V>>,
    root: Option<NodeId>,
    transactions: u64,
    ops: OpsPolicy<K, V>,
    no_overwrite: bool,
}

impl<'a, K: ?Sized + ToOwned, V: ?Sized + ToOwned> TreeMap<'a, K, V> {
    pub fn new(ops: OpsPolicy<K, V>, no_overwrite: bool) -> Self {
        Self {
            id: MapId::fresh(),
            nodes: SlotMap::with_key(),
            root: None,
            transactions: 0,
            ops,
            no_overwrite,
        }
    }

    pub fn ops(&self) -> &OpsPolicy<K, V> {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Count of structural changes (node insertions and removals) so far.
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    #[inline]
    fn is_red(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|id| self.nodes[id].color == Color::Red)
    }

    #[inline]
    fn paint(&mut self, id: NodeId, color: Color) {
        self.nodes[id].color = color;
    }

    /// Point `slot` (a parent and side, or the root when `None`) at `child`.
    #[inline]
    fn link(&mut self, slot: Option<(NodeId, Dir)>, child: Option<NodeId>) {
        match slot {
            None => self.root = child,
            Some((parent, dir)) => *self.nodes[parent].child_mut(dir) = child,
        }
    }

    /// Rotate `top` down toward `dir`; its child on the other side takes
    /// its place in `slot` and is returned.
    fn rotate(&mut self, slot: Option<(NodeId, Dir)>, top: NodeId, dir: Dir) -> NodeId {
        let pivot = self.nodes[top]
            .child(dir.flip())
            .expect("rotation needs a child on the far side");
        let inner = self.nodes[pivot].child(dir);
        *self.nodes[top].child_mut(dir.flip()) = inner;
        *self.nodes[pivot].child_mut(dir) = Some(top);
        self.link(slot, Some(pivot));
        pivot
    }

    fn locate(&self, key: &K) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = &self.nodes[id];
            cur = match self.ops.compare(key, &node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.locate(key).map(|id| &*self.nodes[id].value)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.locate(key).map(|id| {
            let node = &self.nodes[id];
            (&*node.key, &*node.value)
        })
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.locate(key).is_some()
    }

    /// Entry with the smallest key.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.extreme(Dir::Left)
    }

    /// Entry with the largest key.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.extreme(Dir::Right)
    }

    fn extreme(&self, dir: Dir) -> Option<(&K, &V)> {
        let mut id = self.root?;
        while let Some(next) = self.nodes[id].child(dir) {
            id = next;
        }
        let node = &self.nodes[id];
        Some((&*node.key, &*node.value))
    }

    /// Root key and its color.
    pub fn root(&self) -> Option<(&K, Color)> {
        self.root.map(|id| {
            let node = &self.nodes[id];
            (&*node.key, node.color)
        })
    }

    /// Insert `key`, or replace the value stored under it.
    ///
    /// Replacing does not count as a structural change; the cursor's
    /// recorded position stays valid across it.
    pub fn insert(&mut self, key: Cow<'a, K>, value: Cow<'a, V>) -> Result<Added> {
        let mut path = Path::new();
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = &self.nodes[id];
            let dir = match self.ops.compare(&key, &node.key) {
                Ordering::Less => Dir::Left,
                Ordering::Greater => Dir::Right,
                Ordering::Equal => {
                    if self.no_overwrite {
                        return Err(MapError::AlreadyExists);
                    }
                    let value = self.ops.adopt_data(value);
                    drop(core::mem::replace(&mut self.nodes[id].value, value));
                    return Ok(Added::Updated);
                }
            };
            path.push((id, dir));
            cur = node.child(dir);
        }

        if self.nodes.len() >= MAX_ENTRIES {
            return Err(MapError::OutOfMemory);
        }
        let id = self.nodes.insert(Node {
            left: None,
            right: None,
            color: Color::Red,
            key: self.ops.adopt_key(key),
            value: self.ops.adopt_data(value),
        });
        self.link(path.last().copied(), Some(id));
        self.transactions += 1;
        self.insert_fixup(path);
        Ok(Added::Inserted)
    }

    /// Restore the invariants after a red leaf was hung below `path`.
    fn insert_fixup(&mut self, mut path: Path) {
        while let Some((parent, pdir)) = path.pop() {
            if !self.is_red(Some(parent)) {
                break;
            }
            // The root is black, so a red parent has a grandparent.
            let Some((grand, gdir)) = path.pop() else {
                break;
            };
            let uncle = self.nodes[grand].child(gdir.flip());
            if let Some(uncle) = uncle.filter(|&u| self.is_red(Some(u))) {
                self.paint(parent, Color::Black);
                self.paint(uncle, Color::Black);
                self.paint(grand, Color::Red);
                continue;
            }
            let mut top = parent;
            if pdir != gdir {
                top = self.rotate(Some((grand, gdir)), parent, gdir);
            }
            self.rotate(path.last().copied(), grand, gdir.flip());
            self.paint(top, Color::Black);
            self.paint(grand, Color::Red);
            break;
        }
        if let Some(root) = self.root {
            self.paint(root, Color::Black);
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<Cow<'a, V>> {
        let mut path = Path::new();
        let mut cur = self.root;
        let target = loop {
            let id = cur?;
            let dir = match self.ops.compare(key, &self.nodes[id].key) {
                Ordering::Less => Dir::Left,
                Ordering::Greater => Dir::Right,
                Ordering::Equal => break id,
            };
            path.push((id, dir));
            cur = self.nodes[id].child(dir);
        };

        let removed_color;
        let replacement;
        match (self.nodes[target].left, self.nodes[target].right) {
            (Some(_), Some(right)) => {
                // Splice out the in-order successor and move it into the
                // target's position, taking over the target's color.
                let target_slot = path.last().copied();
                let target_depth = path.len();
                path.push((target, Dir::Right));
                let mut succ = right;
                while let Some(left) = self.nodes[succ].left {
                    path.push((succ, Dir::Left));
                    succ = left;
                }
                replacement = self.nodes[succ].right;
                removed_color = self.nodes[succ].color;
                self.link(path.last().copied(), replacement);

                let t = &self.nodes[target];
                let (left, right, color) = (t.left, t.right, t.color);
                let s = &mut self.nodes[succ];
                s.left = left;
                s.right = right;
                s.color = color;
                self.link(target_slot, Some(succ));
                path[target_depth] = (succ, Dir::Right);
            }
            (child, None) | (None, child) => {
                replacement = child;
                removed_color = self.nodes[target].color;
                self.link(path.last().copied(), replacement);
            }
        }

        self.transactions += 1;
        if removed_color == Color::Black {
            self.remove_fixup(path, replacement);
        }
        self.nodes.remove(target).map(|node| node.value)
    }

    /// Restore black height after a black node was unlinked; `x` sits in
    /// the slot named by the last entry of `path`.
    fn remove_fixup(&mut self, mut path: Path, mut x: Option<NodeId>) {
        while !self.is_red(x) {
            let Some(&(parent, dir)) = path.last() else {
                break;
            };
            let mut sib = self.nodes[parent]
                .child(dir.flip())
                .expect("black height guarantees a sibling");

            if self.is_red(Some(sib)) {
                self.paint(sib, Color::Black);
                self.paint(parent, Color::Red);
                let slot = path.len().checked_sub(2).map(|i| path[i]);
                self.rotate(slot, parent, dir);
                let last = path.len() - 1;
                path[last] = (sib, dir);
                path.push((parent, dir));
                sib = self.nodes[parent]
                    .child(dir.flip())
                    .expect("black height guarantees a sibling");
            }

            let near = self.nodes[sib].child(dir);
            let far = self.nodes[sib].child(dir.flip());
            if !self.is_red(near) && !self.is_red(far) {
                self.paint(sib, Color::Red);
                x = Some(parent);
                path.pop();
                continue;
            }

            if !self.is_red(far) {
                if let Some(near) = near {
                    self.paint(near, Color::Black);
                }
                self.paint(sib, Color::Red);
                sib = self.rotate(Some((parent, dir.flip())), sib, dir.flip());
            }

            let parent_color = self.nodes[parent].color;
            self.paint(sib, parent_color);
            self.paint(parent, Color::Black);
            if let Some(far) = self.nodes[sib].child(dir.flip()) {
                self.paint(far, Color::Black);
            }
            let slot = path.len().checked_sub(2).map(|i| path[i]);
            self.rotate(slot, parent, dir);
            x = self.root;
            break;
        }
        if let Some(x) = x {
            self.paint(x, Color::Black);
        }
    }

    /// Release every node in post-order without rebalancing.
    pub(crate) fn destroy(&mut self) -> usize {
        let mut released = 0;
        let mut stack: Vec<NodeId> = self.root.take().into_iter().collect();
        while let Some(&id) = stack.last() {
            let node = &mut self.nodes[id];
            if let Some(left) = node.left.take() {
                stack.push(left);
            } else if let Some(right) = node.right.take() {
                stack.push(right);
            } else {
                stack.pop();
                self.nodes.remove(id);
                released += 1;
            }
        }
        debug_assert!(self.nodes.is_empty());
        if released > 0 {
            self.transactions += 1;
        }
        released
    }

    /// Remove every entry; the map stays usable.
    pub fn clear(&mut self) -> usize {
        self.destroy()
    }

    fn leftmost(&self, from: Option<NodeId>, path: &mut Path) -> Option<NodeId> {
        let mut id = from?;
        while let Some(left) = self.nodes[id].left {
            path.push((id, Dir::Left));
            id = left;
        }
        Some(id)
    }

    /// Pop to the nearest ancestor reached through a left branch.
    fn climb(path: &mut Path) -> Option<NodeId> {
        while let Some((id, dir)) = path.pop() {
            if dir == Dir::Left {
                return Some(id);
            }
        }
        None
    }

    fn successor(&self, path: &mut Path, id: NodeId) -> Option<NodeId> {
        match self.nodes[id].right {
            Some(right) => {
                path.push((id, Dir::Right));
                self.leftmost(Some(right), path)
            }
            None => Self::climb(path),
        }
    }

    /// Smallest node with a key strictly greater than `key`.
    fn seek_after(&self, key: &K, path: &mut Path) -> Option<NodeId> {
        path.clear();
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = &self.nodes[id];
            let dir = match self.ops.compare(key, &node.key) {
                Ordering::Less => Dir::Left,
                _ => Dir::Right,
            };
            path.push((id, dir));
            cur = node.child(dir);
        }
        Self::climb(path)
    }

    pub(crate) fn cursor(&self) -> TreeCursor<'a, K> {
        let mut path = Path::new();
        let next = self.leftmost(self.root, &mut path);
        TreeCursor::new(self.id, path, next, self.transactions)
    }

    /// Advance `cursor` one entry in key order.
    ///
    /// When the tree changed shape since the cursor's last step, the
    /// recorded path is discarded and the position is re-derived from the
    /// checkpoint key: traversal resumes at the smallest key still present
    /// that is greater than the last one returned.
    pub(crate) fn step<'m>(&'m self, cursor: &mut TreeCursor<'a, K>) -> Option<(&'m K, &'m V)> {
        if cursor.finished {
            return None;
        }
        // Node ids are only meaningful in the arena that issued them.
        if cursor.owner != self.id {
            cursor.finish();
            return None;
        }
        if cursor.transactions != self.transactions {
            cursor.next = match &cursor.checkpoint {
                Some(key) => self.seek_after(key, &mut cursor.path),
                None => {
                    cursor.path.clear();
                    self.leftmost(self.root, &mut cursor.path)
                }
            };
            cursor.transactions = self.transactions;
        }
        let Some(id) = cursor.next else {
            cursor.finish();
            return None;
        };
        cursor.next = self.successor(&mut cursor.path, id);
        let node = &self.nodes[id];
        cursor.checkpoint = Some(self.ops.checkpoint(&node.key));
        Some((&*node.key, &*node.value))
    }

    /// Verify the red-black and ordering invariants; returns the black
    /// height on success.
    pub fn check_invariants(&self) -> core::result::Result<usize, Violation> {
        if self.is_red(self.root) {
            return Err(Violation::RedRoot);
        }
        let mut reached = 0;
        let height = self.black_height(self.root, &mut reached)?;
        if reached != self.nodes.len() {
            return Err(Violation::Count);
        }
        let mut path = Path::new();
        let mut cur = self.leftmost(self.root, &mut path);
        let mut prev: Option<&K> = None;
        while let Some(id) = cur {
            let key = &*self.nodes[id].key;
            if prev.is_some_and(|p| self.ops.compare(p, key) != Ordering::Less) {
                return Err(Violation::Order);
            }
            prev = Some(key);
            cur = self.successor(&mut path, id);
        }
        Ok(height)
    }

    fn black_height(
        &self,
        id: Option<NodeId>,
        reached: &mut usize,
    ) -> core::result::Result<usize, Violation> {
        let Some(id) = id else {
            return Ok(1);
        };
        *reached += 1;
        let node = &self.nodes[id];
        if node.color == Color::Red && (self.is_red(node.left) || self.is_red(node.right)) {
            return Err(Violation::RedRed);
        }
        let left = self.black_height(node.left, reached)?;
        let right = self.black_height(node.right, reached)?;
        if left != right {
            return Err(Violation::BlackHeight);
        }
        Ok(left + usize::from(node.color == Color::Black))
    }
}
