//! Order-statistic binary search tree.
//!
//! An unbalanced BST whose nodes record their subtree size, which makes rank
//! selection ([`OrderStatTree::kth_smallest`]) a single descent. Unlike
//! [`Octree`](crate::Octree), inserting an existing key is an error.

use std::cmp::Ordering;

use crate::error::{Error, Result};

type Link<K, V> = Option<Box<BstNode<K, V>>>;

#[derive(Clone, Debug)]
struct BstNode<K, V> {
    key: K,
    item: V,
    subtree_size: usize,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> BstNode<K, V> {
    fn leaf(key: K, item: V) -> Self {
        Self {
            key,
            item,
            subtree_size: 1,
            left: None,
            right: None,
        }
    }

    fn recount(&mut self) {
        self.subtree_size = 1 + link_size(&self.left) + link_size(&self.right);
    }
}

#[inline]
fn link_size<K, V>(link: &Link<K, V>) -> usize {
    link.as_ref().map_or(0, |n| n.subtree_size)
}

/// Ordered map with rank selection.
#[derive(Clone, Debug)]
pub struct OrderStatTree<K, V> {
    root: Link<K, V>,
}

impl<K: Ord, V> OrderStatTree<K, V> {
    pub fn new() -> Self {
        Self { root: None }
    }

    #[inline]
    pub fn len(&self) -> usize {
        link_size(&self.root)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn get(&self, key: &K) -> Result<&V> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            current = match key.cmp(&node.key) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Ok(&node.item),
            };
        }
        Err(Error::NotFound)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_ok()
    }

    /// Insert a new key. Fails with [`Error::DuplicateKey`] if it is present.
    pub fn insert(&mut self, key: K, item: V) -> Result<()> {
        insert_into(&mut self.root, key, item)
    }

    /// Remove `key` and return its item.
    pub fn remove(&mut self, key: &K) -> Result<V> {
        remove_from(&mut self.root, key)
    }

    /// The `rank`-th smallest entry, counting from 1.
    pub fn kth_smallest(&self, rank: usize) -> Result<(&K, &V)> {
        let len = self.len();
        if rank == 0 || rank > len {
            return Err(Error::RankOutOfRange { rank, len });
        }

        let mut k = rank;
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            let left = link_size(&node.left);
            current = match k.cmp(&(left + 1)) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Equal => return Ok((&node.key, &node.item)),
                Ordering::Greater => {
                    k -= left + 1;
                    node.right.as_deref()
                }
            };
        }
        Err(Error::InvariantViolation(format!(
            "rank {} not reachable despite {} recorded nodes",
            rank, len
        )))
    }

    /// Entries with `low <= key <= high`, in key order.
    pub fn range(&self, low: &K, high: &K) -> Vec<(&K, &V)> {
        let mut out = Vec::new();
        if low <= high {
            collect_range(self.root.as_deref(), low, high, &mut out);
        }
        out
    }

    /// In-order iterator.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter {
            stack: Vec::new(),
            remaining: self.len(),
        };
        iter.push_left(self.root.as_deref());
        iter
    }
}

impl<K: Ord, V> Default for OrderStatTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_into<K: Ord, V>(link: &mut Link<K, V>, key: K, item: V) -> Result<()> {
    let node = match link {
        Some(node) => node,
        None => {
            *link = Some(Box::new(BstNode::leaf(key, item)));
            return Ok(());
        }
    };
    match key.cmp(&node.key) {
        Ordering::Less => insert_into(&mut node.left, key, item)?,
        Ordering::Greater => insert_into(&mut node.right, key, item)?,
        Ordering::Equal => return Err(Error::DuplicateKey),
    }
    node.subtree_size += 1;
    Ok(())
}

fn remove_from<K: Ord, V>(link: &mut Link<K, V>, key: &K) -> Result<V> {
    let Some(node) = link.as_deref_mut() else {
        return Err(Error::NotFound);
    };
    let removed = match key.cmp(&node.key) {
        Ordering::Less => remove_from(&mut node.left, key)?,
        Ordering::Greater => remove_from(&mut node.right, key)?,
        Ordering::Equal => {
            let Some(found) = link.take() else {
                return Err(Error::NotFound);
            };
            let (item, replacement) = splice(*found);
            *link = replacement;
            return Ok(item);
        }
    };
    node.subtree_size -= 1;
    Ok(removed)
}

/// Dismantle a node, returning its item and the subtree that replaces it.
fn splice<K, V>(node: BstNode<K, V>) -> (V, Link<K, V>) {
    let BstNode { item, left, right, .. } = node;
    let replacement = match (left, right) {
        (None, None) => None,
        (Some(child), None) | (None, Some(child)) => Some(child),
        (Some(left), Some(right)) => {
            let (mut successor, rest) = take_min(right);
            successor.left = Some(left);
            successor.right = rest;
            successor.recount();
            Some(successor)
        }
    };
    (item, replacement)
}

/// Split the smallest node off `root`, returning it and what remains.
fn take_min<K, V>(mut root: Box<BstNode<K, V>>) -> (Box<BstNode<K, V>>, Link<K, V>) {
    match root.left.take() {
        None => {
            let rest = root.right.take();
            root.subtree_size = 1;
            (root, rest)
        }
        Some(left) => {
            let (min, rest) = take_min(left);
            root.left = rest;
            root.subtree_size -= 1;
            (min, Some(root))
        }
    }
}

fn collect_range<'a, K: Ord, V>(
    node: Option<&'a BstNode<K, V>>,
    low: &K,
    high: &K,
    out: &mut Vec<(&'a K, &'a V)>,
) {
    let Some(node) = node else {
        return;
    };
    if node.key > *low {
        collect_range(node.left.as_deref(), low, high, out);
    }
    if *low <= node.key && node.key <= *high {
        out.push((&node.key, &node.item));
    }
    if node.key < *high {
        collect_range(node.right.as_deref(), low, high, out);
    }
}

pub struct Iter<'a, K, V> {
    stack: Vec<&'a BstNode<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut node: Option<&'a BstNode<K, V>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
