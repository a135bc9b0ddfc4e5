//! Red-black tree aggregation map.
//!
//! One node per distinct key; inserting a key that already exists merges the
//! count into that node without touching the tree shape. New keys are placed
//! by ordinary binary-search descent, colored red, and the tree is then
//! rebalanced with the classic insert fixup (recolor, or one/two rotations).
//!
//! Structure:
//! - All nodes live in a single `Vec` (no raw pointers, no `Rc`)
//! - Links are `u32` indices with `NONE` as the absent sentinel
//! - `parent` is a navigational back-link used only by the fixup; the arena
//!   alone owns nodes, so dropping the map drops every node
//! - Nodes are never removed, so indices stay stable for the map's lifetime
//!
//! Operations:
//! - insert: O(log n) - descent + at most two rotations
//! - get/lookup: O(log n) - descent
//! - grand_total: O(1) - maintained incrementally
//!
//! Totals saturate at `u64::MAX` rather than overflow.

use std::cmp::Ordering;

use smallvec::SmallVec;
use thiserror::Error;

use crate::aggregate::{Aggregator, add_count};
use crate::error::{Result, TallyError};
use crate::record::Record;

/// Index into the node arena.
type NodeIdx = u32;
/// Sentinel value for no parent / no child.
const NONE: NodeIdx = u32::MAX;

/// Node color. Absent children count as black.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Clone, Debug)]
struct Node {
    key: String,
    /// Sum of every count merged into this key.
    total: u64,
    color: Color,
    /// Back-link for rebalancing (NONE for root). Never owns.
    parent: NodeIdx,
    left: NodeIdx,
    right: NodeIdx,
}

/// A broken structural property, reported by `check_invariants`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("root is red")]
    RedRoot,

    #[error("red node {key:?} has a red child")]
    RedRed { key: String },

    #[error("black height differs under {key:?}: left {left}, right {right}")]
    BlackHeight {
        key: String,
        left: usize,
        right: usize,
    },

    #[error("key {key:?} violates search order")]
    Order { key: String },

    #[error("parent link of {key:?} does not match its position")]
    ParentLink { key: String },

    #[error("{reachable} nodes reachable from root, {stored} stored")]
    Unreachable { reachable: usize, stored: usize },

    #[error("sum of node totals {sum} != grand total {grand_total}")]
    GrandTotal { sum: u64, grand_total: u64 },
}

/// Per-key totals in a red-black tree, plus a running grand total.
#[derive(Clone, Debug)]
pub struct AggregationMap {
    nodes: Vec<Node>,
    root: NodeIdx,
    grand_total: u64,
}

impl AggregationMap {
    pub fn new() -> AggregationMap {
        return AggregationMap {
            nodes: Vec::new(),
            root: NONE,
            grand_total: 0,
        };
    }

    /// Create a map with arena room for `keys` distinct keys.
    pub fn with_capacity(keys: usize) -> AggregationMap {
        return AggregationMap {
            nodes: Vec::with_capacity(keys),
            root: NONE,
            grand_total: 0,
        };
    }

    /// Number of distinct keys.
    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.nodes.len();
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.nodes.is_empty();
    }

    #[inline(always)]
    pub fn grand_total(&self) -> u64 {
        return self.grand_total;
    }

    #[inline(always)]
    fn node(&self, idx: NodeIdx) -> &Node {
        return &self.nodes[idx as usize];
    }

    #[inline(always)]
    fn node_mut(&mut self, idx: NodeIdx) -> &mut Node {
        return &mut self.nodes[idx as usize];
    }

    #[inline(always)]
    fn is_red(&self, idx: NodeIdx) -> bool {
        return idx != NONE && self.node(idx).color == Color::Red;
    }

    // --- Lookup ---

    /// Descend from the root to the node holding `key`, or NONE.
    fn find(&self, key: &str) -> NodeIdx {
        let mut current = self.root;
        while current != NONE {
            let node = self.node(current);
            current = match key.cmp(node.key.as_str()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return current,
            };
        }
        return NONE;
    }

    /// The aggregated total for `key`, if it was ever inserted.
    pub fn get(&self, key: &str) -> Option<u64> {
        let idx = self.find(key);
        if idx == NONE {
            return None;
        }
        return Some(self.node(idx).total);
    }

    /// The aggregated total for `key`, or `KeyNotFound`.
    pub fn lookup(&self, key: &str) -> Result<u64> {
        return self
            .get(key)
            .ok_or_else(|| TallyError::KeyNotFound(key.to_string()));
    }

    pub fn contains_key(&self, key: &str) -> bool {
        return self.find(key) != NONE;
    }

    /// Iterate `(key, total)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        return self.nodes.iter().map(|node| (node.key.as_str(), node.total));
    }

    // --- Insertion ---

    /// Merge `count` into `key`, creating the key if it is new.
    ///
    /// A duplicate key only bumps its total; the tree shape and colors are
    /// untouched. A new key is attached as a red leaf and rebalanced.
    ///
    /// # Panics
    ///
    /// If the map already holds `u32::MAX` distinct keys, since node
    /// indices are `u32` and `u32::MAX` is the absent sentinel.
    pub fn insert(&mut self, key: &str, count: u64) {
        add_count(&mut self.grand_total, count, "grand total");

        let mut parent = NONE;
        let mut went_left = false;
        let mut current = self.root;
        while current != NONE {
            let node = self.node(current);
            match key.cmp(node.key.as_str()) {
                Ordering::Less => {
                    parent = current;
                    went_left = true;
                    current = node.left;
                }
                Ordering::Greater => {
                    parent = current;
                    went_left = false;
                    current = node.right;
                }
                Ordering::Equal => {
                    add_count(&mut self.node_mut(current).total, count, "key total");
                    return;
                }
            }
        }

        let idx = next_index(self.nodes.len());
        self.nodes.push(Node {
            key: key.to_string(),
            total: count,
            color: Color::Red,
            parent,
            left: NONE,
            right: NONE,
        });

        if parent == NONE {
            self.root = idx;
        } else if went_left {
            self.node_mut(parent).left = idx;
        } else {
            self.node_mut(parent).right = idx;
        }

        self.insert_fixup(idx);
    }

    /// Restore the red-black properties after attaching red node `n`.
    fn insert_fixup(&mut self, mut n: NodeIdx) {
        while n != self.root && self.is_red(self.node(n).parent) {
            let mut p = self.node(n).parent;
            // A red parent is never the root, so the grandparent exists.
            let g = self.node(p).parent;
            debug_assert!(g != NONE);

            if p == self.node(g).left {
                let u = self.node(g).right;
                if self.is_red(u) {
                    self.node_mut(p).color = Color::Black;
                    self.node_mut(u).color = Color::Black;
                    self.node_mut(g).color = Color::Red;
                    n = g;
                } else {
                    if n == self.node(p).right {
                        // Inner child: turn it into an outer one.
                        self.rotate_left(p);
                        n = p;
                        p = self.node(n).parent;
                    }
                    self.rotate_right(g);
                    self.swap_colors(p, g);
                    n = p;
                }
            } else {
                let u = self.node(g).left;
                if self.is_red(u) {
                    self.node_mut(p).color = Color::Black;
                    self.node_mut(u).color = Color::Black;
                    self.node_mut(g).color = Color::Red;
                    n = g;
                } else {
                    if n == self.node(p).left {
                        self.rotate_right(p);
                        n = p;
                        p = self.node(n).parent;
                    }
                    self.rotate_left(g);
                    self.swap_colors(p, g);
                    n = p;
                }
            }
        }

        let root = self.root;
        self.node_mut(root).color = Color::Black;
    }

    fn swap_colors(&mut self, a: NodeIdx, b: NodeIdx) {
        let color_a = self.node(a).color;
        let color_b = self.node(b).color;
        self.node_mut(a).color = color_b;
        self.node_mut(b).color = color_a;
    }

    /// Put `new` where `old` hangs: under `old`'s parent, or at the root.
    fn replace_child(&mut self, old: NodeIdx, new: NodeIdx) {
        let parent = self.node(old).parent;
        self.node_mut(new).parent = parent;
        if parent == NONE {
            self.root = new;
        } else if self.node(parent).left == old {
            self.node_mut(parent).left = new;
        } else {
            self.node_mut(parent).right = new;
        }
    }

    /// Promote `x`'s right child into `x`'s position.
    fn rotate_left(&mut self, x: NodeIdx) {
        let y = self.node(x).right;
        debug_assert!(y != NONE);
        log::trace!("rotate left at {:?}", self.node(x).key);

        let y_left = self.node(y).left;
        self.node_mut(x).right = y_left;
        if y_left != NONE {
            self.node_mut(y_left).parent = x;
        }

        self.replace_child(x, y);
        self.node_mut(y).left = x;
        self.node_mut(x).parent = y;
    }

    /// Promote `x`'s left child into `x`'s position.
    fn rotate_right(&mut self, x: NodeIdx) {
        let y = self.node(x).left;
        debug_assert!(y != NONE);
        log::trace!("rotate right at {:?}", self.node(x).key);

        let y_right = self.node(y).right;
        self.node_mut(x).left = y_right;
        if y_right != NONE {
            self.node_mut(y_right).parent = x;
        }

        self.replace_child(x, y);
        self.node_mut(y).right = x;
        self.node_mut(x).parent = y;
    }

    // --- Invariant checking ---

    /// Number of nodes on the longest root-to-leaf path (0 when empty).
    pub fn height(&self) -> usize {
        let mut stack: SmallVec<[(NodeIdx, usize); 64]> = SmallVec::new();
        if self.root != NONE {
            stack.push((self.root, 1));
        }

        let mut height = 0;
        while let Some((idx, depth)) = stack.pop() {
            height = height.max(depth);
            let node = self.node(idx);
            if node.left != NONE {
                stack.push((node.left, depth + 1));
            }
            if node.right != NONE {
                stack.push((node.right, depth + 1));
            }
        }
        return height;
    }

    /// Verify every structural invariant and return the black height.
    ///
    /// Checks: black root, no red node with a red child, uniform black
    /// height, strict search order, parent links matching child links, every
    /// stored node reachable, and node totals summing to the grand total.
    pub fn check_invariants(&self) -> std::result::Result<usize, InvariantViolation> {
        if self.root == NONE {
            if !self.nodes.is_empty() {
                return Err(InvariantViolation::Unreachable {
                    reachable: 0,
                    stored: self.nodes.len(),
                });
            }
            return Ok(0);
        }

        if self.node(self.root).color != Color::Black {
            return Err(InvariantViolation::RedRoot);
        }
        if self.node(self.root).parent != NONE {
            return Err(InvariantViolation::ParentLink {
                key: self.node(self.root).key.clone(),
            });
        }

        let mut reachable = 0usize;
        let mut sum = 0u64;
        let black_height = self.check_subtree(self.root, None, None, &mut reachable, &mut sum)?;

        if reachable != self.nodes.len() {
            return Err(InvariantViolation::Unreachable {
                reachable,
                stored: self.nodes.len(),
            });
        }
        if sum != self.grand_total {
            return Err(InvariantViolation::GrandTotal {
                sum,
                grand_total: self.grand_total,
            });
        }
        return Ok(black_height);
    }

    /// Recursive worker for `check_invariants`. Depth is the tree height.
    fn check_subtree(
        &self,
        idx: NodeIdx,
        lower: Option<&str>,
        upper: Option<&str>,
        reachable: &mut usize,
        sum: &mut u64,
    ) -> std::result::Result<usize, InvariantViolation> {
        if idx == NONE {
            return Ok(1);
        }

        let node = self.node(idx);
        *reachable += 1;
        *sum = sum.saturating_add(node.total);

        let key = node.key.as_str();
        if lower.is_some_and(|lower| key <= lower) || upper.is_some_and(|upper| key >= upper) {
            return Err(InvariantViolation::Order { key: key.to_string() });
        }

        for child in [node.left, node.right] {
            if child == NONE {
                continue;
            }
            if self.node(child).parent != idx {
                return Err(InvariantViolation::ParentLink {
                    key: self.node(child).key.clone(),
                });
            }
            if node.color == Color::Red && self.node(child).color == Color::Red {
                return Err(InvariantViolation::RedRed { key: key.to_string() });
            }
        }

        let left = self.check_subtree(node.left, lower, Some(key), reachable, sum)?;
        let right = self.check_subtree(node.right, Some(key), upper, reachable, sum)?;
        if left != right {
            return Err(InvariantViolation::BlackHeight {
                key: key.to_string(),
                left,
                right,
            });
        }

        let own = if node.color == Color::Black { 1 } else { 0 };
        return Ok(left + own);
    }
}

/// Arena index for the node pushed when the arena holds `len` nodes.
///
/// Panics rather than let the index collide with `NONE`.
fn next_index(len: usize) -> NodeIdx {
    assert!(len < NONE as usize, "node arena exhausted at {} nodes", len);
    return len as NodeIdx;
}

impl Default for AggregationMap {
    fn default() -> Self {
        return Self::new();
    }
}

impl Aggregator for AggregationMap {
    fn name(&self) -> &'static str {
        return "map";
    }

    fn insert(&mut self, key: &str, count: u64) {
        AggregationMap::insert(self, key, count);
    }

    fn total(&self, key: &str) -> Option<u64> {
        return self.get(key);
    }

    fn grand_total(&self) -> u64 {
        return self.grand_total;
    }
}

impl Extend<Record> for AggregationMap {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        self.extend_records(iter);
    }
}

impl FromIterator<Record> for AggregationMap {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut map = AggregationMap::new();
        map.extend(iter);
        return map;
    }
}
