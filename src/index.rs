//! Left-leaning red-black tree keyed by an ordered key.
//!
//! Every node exclusively owns its two children; there are no parent links.
//! Insertion recurses down to a leaf and restores the LLRB shape on the way
//! back up, each level handing the (possibly rotated) subtree root to its
//! caller. Lookups are a plain binary search and never rebalance.
//!
//! Invariants after every `put`:
//! - no node has two red children, and red links only lean left;
//! - every root-to-leaf path crosses the same number of black links;
//! - the root is black;
//! - `size` of each node is `1 + size(left) + size(right)`.
//!
//! Together these bound the height by `2 * log2(n + 1)`.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;

/// Remaining units per night for one category.
pub type DateIndex = OrderedIndex<NaiveDate, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

impl Color {
    fn flip(self) -> Self {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }
}

type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    /// Color of the link from the parent.
    color: Color,
    size: usize,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            color: Color::Red,
            size: 1,
            left: None,
            right: None,
        })
    }
}

fn is_red<K, V>(link: &Link<K, V>) -> bool {
    matches!(link, Some(n) if n.color == Color::Red)
}

fn size<K, V>(link: &Link<K, V>) -> usize {
    link.as_ref().map_or(0, |n| n.size)
}

fn put<K: Ord, V>(link: Link<K, V>, key: K, value: V) -> Box<Node<K, V>> {
    let Some(mut h) = link else {
        return Node::leaf(key, value);
    };

    match key.cmp(&h.key) {
        Ordering::Less => h.left = Some(put(h.left.take(), key, value)),
        Ordering::Greater => h.right = Some(put(h.right.take(), key, value)),
        Ordering::Equal => h.value = value,
    }

    if is_red(&h.right) && !is_red(&h.left) {
        h = rotate_left(h);
    }
    if is_red(&h.left) && h.left.as_ref().is_some_and(|l| is_red(&l.left)) {
        h = rotate_right(h);
    }
    if is_red(&h.left) && is_red(&h.right) {
        flip_colors(&mut h);
    }
    h.size = 1 + size(&h.left) + size(&h.right);
    h
}

/// Turn a right-leaning red link into a left-leaning one.
fn rotate_left<K, V>(mut h: Box<Node<K, V>>) -> Box<Node<K, V>> {
    debug_assert!(is_red(&h.right));
    let Some(mut x) = h.right.take() else {
        unreachable!("rotate_left on a node without a right child");
    };
    h.right = x.left.take();
    x.color = h.color;
    h.color = Color::Red;
    x.size = h.size;
    h.size = 1 + size(&h.left) + size(&h.right);
    x.left = Some(h);
    x
}

/// Turn a left-leaning red link into a right-leaning one.
fn rotate_right<K, V>(mut h: Box<Node<K, V>>) -> Box<Node<K, V>> {
    debug_assert!(is_red(&h.left));
    let Some(mut x) = h.left.take() else {
        unreachable!("rotate_right on a node without a left child");
    };
    h.left = x.right.take();
    x.color = h.color;
    h.color = Color::Red;
    x.size = h.size;
    h.size = 1 + size(&h.left) + size(&h.right);
    x.right = Some(h);
    x
}

fn flip_colors<K, V>(h: &mut Node<K, V>) {
    h.color = h.color.flip();
    if let Some(l) = h.left.as_mut() {
        l.color = l.color.flip();
    }
    if let Some(r) = h.right.as_mut() {
        r.color = r.color.flip();
    }
}

/// Ordered map backed by a left-leaning red-black tree.
#[derive(Debug, Clone)]
pub struct OrderedIndex<K, V> {
    root: Link<K, V>,
}

impl<K, V> Default for OrderedIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OrderedIndex<K, V> {
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        size(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of nodes on the longest root-to-leaf path. 0 when empty.
    pub fn height(&self) -> usize {
        fn height<K, V>(link: &Link<K, V>) -> usize {
            link.as_ref()
                .map_or(0, |n| 1 + height(&n.left).max(height(&n.right)))
        }
        height(&self.root)
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left_spine(self.root.as_deref());
        iter
    }
}

impl<K: Ord, V> OrderedIndex<K, V> {
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut x = self.root.as_deref();
        while let Some(n) = x {
            match key.cmp(&n.key) {
                Ordering::Less => x = n.left.as_deref(),
                Ordering::Greater => x = n.right.as_deref(),
                Ordering::Equal => return Some(&n.value),
            }
        }
        None
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Insert `key`, or overwrite its value if already present.
    pub fn put(&mut self, key: K, value: V) {
        let mut root = put(self.root.take(), key, value);
        root.color = Color::Black;
        self.root = Some(root);
    }

    /// Walk the whole tree and confirm every LLRB invariant. O(n).
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if is_red(&self.root) {
            return Err(InvariantViolation::RedRoot);
        }
        check_node(&self.root, None, None)?;
        Ok(())
    }
}

/// Returns the black height of the subtree rooted at `link`.
fn check_node<K: Ord, V>(
    link: &Link<K, V>,
    lo: Option<&K>,
    hi: Option<&K>,
) -> Result<usize, InvariantViolation> {
    let Some(n) = link else { return Ok(0) };

    if lo.is_some_and(|lo| n.key <= *lo) || hi.is_some_and(|hi| n.key >= *hi) {
        return Err(InvariantViolation::OutOfOrder);
    }
    if is_red(&n.right) {
        return Err(InvariantViolation::RightLeaningRed);
    }
    if n.color == Color::Red && is_red(&n.left) {
        return Err(InvariantViolation::DoubleRed);
    }
    if n.size != 1 + size(&n.left) + size(&n.right) {
        return Err(InvariantViolation::SizeMismatch);
    }

    let left = check_node(&n.left, lo, Some(&n.key))?;
    let right = check_node(&n.right, Some(&n.key), hi)?;
    if left != right {
        return Err(InvariantViolation::BlackImbalance { left, right });
    }
    Ok(left + usize::from(n.color == Color::Black))
}

/// A broken tree invariant. Only reachable through a bug in the balancing code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    RedRoot,
    OutOfOrder,
    RightLeaningRed,
    DoubleRed,
    SizeMismatch,
    BlackImbalance { left: usize, right: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::RedRoot => write!(f, "root is red"),
            InvariantViolation::OutOfOrder => write!(f, "keys out of order"),
            InvariantViolation::RightLeaningRed => write!(f, "red link leans right"),
            InvariantViolation::DoubleRed => write!(f, "two red links in a row"),
            InvariantViolation::SizeMismatch => write!(f, "subtree size out of date"),
            InvariantViolation::BlackImbalance { left, right } => {
                write!(f, "black height mismatch: left {left}, right {right}")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// In-order iterator. Holds at most one pending node per tree level.
pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left_spine(&mut self, mut node: Option<&'a Node<K, V>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        self.push_left_spine(n.right.as_deref());
        Some((&n.key, &n.value))
    }
}
