//! Weight-balanced octree keyed by [`Point`].
//!
//! Every node stores one key and routes other keys into eight child slots by
//! [`Octant`]. Sizes are kept per subtree; when an insertion leaves a node on
//! its path skewed (see [`OctreeConfig`]) the whole subtree under that node is
//! rebuilt around a median pivot.
//!
//! Routing holds recursively: every key in the subtree at slot `o` of a node
//! has octant `o` relative to that node's key. Lookup therefore only ever
//! follows a single path.

use std::collections::HashSet;
use std::fmt;

use crate::config::{OctreeConfig, Skew, BRANCHING};
use crate::error::{Error, Result};
use crate::point::{Octant, Point};

type Slot<V> = Option<Box<Node<V>>>;

/// Sorted groups at or below this size try every element as pivot.
const PIVOT_SCAN_LIMIT: usize = 32;

// =============================================================================
// Node
// =============================================================================

/// A tree node: one key, one item, and up to eight owned children.
#[derive(Clone)]
pub struct Node<V> {
    key: Point,
    item: V,
    /// Nodes in this subtree, this one included.
    subtree_size: usize,
    children: [Slot<V>; BRANCHING],
    /// Set when a rebuild could not balance this node.
    settled: Option<Settled>,
}

/// Size and skew a rebuild left a node with.
#[derive(Clone, Copy, Debug)]
struct Settled {
    size: usize,
    skew: Skew,
}

impl<V> Node<V> {
    fn leaf(key: Point, item: V) -> Self {
        Self {
            key,
            item,
            subtree_size: 1,
            children: std::array::from_fn(|_| None),
            settled: None,
        }
    }

    #[inline]
    pub fn key(&self) -> &Point {
        &self.key
    }

    #[inline]
    pub fn item(&self) -> &V {
        &self.item
    }

    #[inline]
    pub fn subtree_size(&self) -> usize {
        self.subtree_size
    }

    #[inline]
    pub fn child(&self, octant: Octant) -> Option<&Node<V>> {
        self.children[octant.index()].as_deref()
    }

    /// The child whose slot `point` would route into.
    pub fn child_for(&self, point: &Point) -> Option<&Node<V>> {
        Octant::of(&self.key, point).and_then(|octant| self.child(octant))
    }

    /// Present children in octant order.
    pub fn children(&self) -> impl Iterator<Item = (Octant, &Node<V>)> + '_ {
        Octant::all().filter_map(move |octant| self.child(octant).map(|c| (octant, c)))
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    fn child_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.children.iter().flatten().map(|c| c.subtree_size)
    }

    fn recount(&mut self) {
        self.subtree_size = 1 + self.child_sizes().sum::<usize>();
    }

    fn skew(&self, config: &OctreeConfig) -> Skew {
        config.skew(self.subtree_size, self.child_sizes())
    }
}

// =============================================================================
// Tree
// =============================================================================

/// Weight-balanced octree mapping [`Point`]s to items.
///
/// ```rust
/// use weighted_octree::{Octree, Point};
///
/// let mut tree = Octree::new();
/// tree.insert(Point::new(3, 3, 3), "A").unwrap();
/// tree.insert(Point::new(1, 5, 2), "B").unwrap();
///
/// assert_eq!(tree.get(&Point::new(1, 5, 2)), Ok(&"B"));
/// assert!(!tree.contains(&Point::new(0, 0, 0)));
/// assert_eq!(tree.len(), 2);
/// ```
#[derive(Clone)]
pub struct Octree<V> {
    root: Slot<V>,
    length: usize,
    config: OctreeConfig,
    rebuilds: usize,
}

/// Per-insert bookkeeping threaded through the descent.
struct Insertion<'a> {
    config: &'a OctreeConfig,
    /// A new node was created somewhere below.
    placed: bool,
    rebuilds: usize,
}

impl<V> Octree<V> {
    pub fn new() -> Self {
        Self::with_config(OctreeConfig::default())
    }

    pub fn with_config(config: OctreeConfig) -> Self {
        Self {
            root: None,
            length: 0,
            config,
            rebuilds: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Number of subtree rebuilds performed so far.
    #[inline]
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    #[inline]
    pub fn root(&self) -> Option<&Node<V>> {
        self.root.as_deref()
    }

    /// Longest root-to-leaf path, counted in nodes.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(&Node<V>, usize)> = self.root().map(|r| (r, 1)).into_iter().collect();
        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);
            stack.extend(node.children().map(|(_, c)| (c, depth + 1)));
        }
        height
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.length = 0;
    }

    pub fn contains(&self, key: &Point) -> bool {
        self.get(key).is_ok()
    }

    pub fn get(&self, key: &Point) -> Result<&V> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match Octant::of(&node.key, key) {
                None => return Ok(&node.item),
                Some(octant) => current = node.child(octant),
            }
        }
        Err(Error::NotFound)
    }

    pub fn get_mut(&mut self, key: &Point) -> Result<&mut V> {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            match Octant::of(&node.key, key) {
                None => return Ok(&mut node.item),
                Some(octant) => current = node.children[octant.index()].as_deref_mut(),
            }
        }
        Err(Error::NotFound)
    }

    /// Insert `item` under `key`, returning the item it replaced.
    ///
    /// A duplicate key overwrites in place and leaves the size unchanged. A
    /// new key may trigger rebuilds along its path; if a rebuild finds the
    /// subtree corrupted the error is returned, the subtree is left as it was,
    /// and the key stays inserted.
    pub fn insert(&mut self, key: Point, item: V) -> Result<Option<V>> {
        let mut insertion = Insertion {
            config: &self.config,
            placed: false,
            rebuilds: 0,
        };
        let outcome = insert_into(&mut self.root, key, item, &mut insertion);
        if insertion.placed {
            self.length += 1;
        }
        self.rebuilds += insertion.rebuilds;
        outcome
    }

    /// Pre-order iterator over `(key, item)` pairs.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            stack: self.root().into_iter().collect(),
            remaining: self.length,
        }
    }

    /// Check sizes, routing and the element count over the whole tree.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = self.root() else {
            if self.length == 0 {
                return Ok(());
            }
            return Err(violation(format!(
                "empty tree reports {} elements",
                self.length
            )));
        };

        audit(root)?;
        check_subtree(root, &mut Vec::new())?;
        if root.subtree_size != self.length {
            return Err(violation(format!(
                "root holds {} nodes but length is {}",
                root.subtree_size, self.length
            )));
        }
        Ok(())
    }
}

impl<V> Default for Octree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for Octree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, V> {
    stack: Vec<&'a Node<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a Point, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        for slot in node.children.iter().rev() {
            if let Some(child) = slot.as_deref() {
                self.stack.push(child);
            }
        }
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<'a, V> IntoIterator for &'a Octree<V> {
    type Item = (&'a Point, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Insertion
// =============================================================================

fn insert_into<V>(
    slot: &mut Slot<V>,
    key: Point,
    item: V,
    insertion: &mut Insertion<'_>,
) -> Result<Option<V>> {
    let node = match slot {
        Some(node) => node,
        None => {
            *slot = Some(Box::new(Node::leaf(key, item)));
            insertion.placed = true;
            return Ok(None);
        }
    };

    let Some(octant) = Octant::of(&node.key, &key) else {
        return Ok(Some(std::mem::replace(&mut node.item, item)));
    };

    let outcome = insert_into(&mut node.children[octant.index()], key, item, insertion);
    if !insertion.placed {
        return outcome;
    }
    // Sizes are fixed up even when a rebuild below failed.
    node.recount();
    outcome?;

    let config = insertion.config;
    if config.rebalance() && needs_rebuild(node, config) {
        rebuild_slot(slot, insertion)?;
    }
    Ok(None)
}

/// A skewed node is rebuilt unless a rebuild already left it skewed. That
/// node is retried once its skew got worse or it grew by half.
fn needs_rebuild<V>(node: &mut Node<V>, config: &OctreeConfig) -> bool {
    let skew = node.skew(config);
    if skew == Skew::Balanced {
        node.settled = None;
        return false;
    }
    match node.settled {
        Some(settled) => {
            skew > settled.skew || node.subtree_size >= settled.size + settled.size / 2
        }
        None => true,
    }
}

// =============================================================================
// Rebuilding
// =============================================================================

/// Replace the subtree in `slot` with a freshly partitioned one.
///
/// The subtree is audited before anything is detached, so a corrupted
/// subtree is reported and left in place.
fn rebuild_slot<V>(slot: &mut Slot<V>, insertion: &mut Insertion<'_>) -> Result<()> {
    let Some(old) = slot.as_deref() else {
        return Ok(());
    };
    let count = audit(old)?;
    let old_key = old.key;

    let Some(old) = slot.take() else {
        return Ok(());
    };
    let mut entries = Vec::with_capacity(count);
    drain(old, &mut entries);
    entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    *slot = build(entries, insertion.config);
    insertion.rebuilds += 1;

    if let Some(new) = slot.as_deref() {
        log::debug!(
            "rebuilt subtree of {} nodes: root {} -> {}",
            count,
            old_key,
            new.key
        );
        if let Some(settled) = new.settled {
            log::debug!(
                "subtree at {} left {:?} skewed; next rebuild once it holds {} nodes",
                new.key,
                settled.skew,
                settled.size + settled.size / 2
            );
        }
    }
    Ok(())
}

/// Walk `root` by reference and confirm it is a tree of `subtree_size`
/// distinct keys. Returns the node count.
fn audit<V>(root: &Node<V>) -> Result<usize> {
    let expected = root.subtree_size;
    let mut visited: HashSet<*const Node<V>> = HashSet::with_capacity(expected);
    let mut keys = Vec::with_capacity(expected);
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if !visited.insert(node as *const Node<V>) {
            return Err(violation(format!("node {} reached twice", node.key)));
        }
        if visited.len() > expected {
            return Err(violation(format!(
                "subtree at {} holds more than its recorded {} nodes",
                root.key, expected
            )));
        }
        keys.push(node.key);
        stack.extend(node.children.iter().flatten().map(|c| &**c));
    }

    if visited.len() != expected {
        return Err(violation(format!(
            "subtree at {} holds {} nodes but records {}",
            root.key,
            visited.len(),
            expected
        )));
    }

    keys.sort_unstable();
    if let Some(pair) = keys.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(violation(format!("key {} stored twice", pair[0])));
    }
    Ok(visited.len())
}

fn check_subtree<V>(node: &Node<V>, path: &mut Vec<(Point, Octant)>) -> Result<()> {
    for &(ancestor, octant) in path.iter() {
        if Octant::of(&ancestor, &node.key) != Some(octant) {
            return Err(violation(format!(
                "key {} misrouted below {}",
                node.key, ancestor
            )));
        }
    }

    let expected = 1 + node.child_sizes().sum::<usize>();
    if node.subtree_size != expected {
        return Err(violation(format!(
            "node {} records size {} but holds {}",
            node.key, node.subtree_size, expected
        )));
    }

    for (octant, child) in node.children() {
        path.push((node.key, octant));
        check_subtree(child, path)?;
        path.pop();
    }
    Ok(())
}

fn drain<V>(root: Box<Node<V>>, out: &mut Vec<(Point, V)>) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let Node {
            key,
            item,
            children,
            ..
        } = *node;
        out.push((key, item));
        stack.extend(children.into_iter().flatten());
    }
}

/// Build a subtree from entries sorted by key, all keys distinct.
fn build<V>(mut entries: Vec<(Point, V)>, config: &OctreeConfig) -> Slot<V> {
    if entries.is_empty() {
        return None;
    }

    let (key, item) = entries.remove(choose_pivot(&entries, config));
    let mut groups: [Vec<(Point, V)>; BRANCHING] = std::array::from_fn(|_| Vec::new());
    for entry in entries {
        groups[Octant::classify(&key, &entry.0).index()].push(entry);
    }

    let mut node = Node::leaf(key, item);
    for (slot, group) in node.children.iter_mut().zip(groups) {
        *slot = build(group, config);
    }
    node.recount();
    let skew = node.skew(config);
    if skew != Skew::Balanced {
        node.settled = Some(Settled {
            size: node.subtree_size,
            skew,
        });
    }
    Some(Box::new(node))
}

/// Index of the pivot for sorted `entries`.
///
/// The middle element wins whenever it balances the node. Otherwise the
/// candidate leaving the mildest skew wins, then the lightest heaviest
/// octant; a lone child under an outlier beats a broken sibling ratio. Small
/// groups try every element, larger ones a spread of quantiles, the point
/// nearest the per-axis median and the extreme point towards each corner.
fn choose_pivot<V>(entries: &[(Point, V)], config: &OctreeConfig) -> usize {
    let middle = entries.len() / 2;
    let mut best = middle;
    let mut best_score = pivot_score(entries, middle, config);
    if best_score.0 == Skew::Balanced {
        return middle;
    }

    let candidates = if entries.len() <= PIVOT_SCAN_LIMIT {
        (0..entries.len()).collect()
    } else {
        sampled_pivots(entries)
    };
    for candidate in candidates {
        let score = pivot_score(entries, candidate, config);
        if score < best_score {
            best = candidate;
            best_score = score;
        }
    }

    if best != middle {
        let (skew, heaviest) = best_score;
        log::trace!(
            "pivot {} ({:?}, heaviest octant {}) replaces middle {}",
            entries[best].0,
            skew,
            heaviest,
            entries[middle].0
        );
    }
    best
}

/// Skew of the node `pivot` would head, then its heaviest octant.
fn pivot_score<V>(entries: &[(Point, V)], pivot: usize, config: &OctreeConfig) -> (Skew, usize) {
    let key = entries[pivot].0;
    let mut counts = [0usize; BRANCHING];
    for (i, (point, _)) in entries.iter().enumerate() {
        if i != pivot {
            counts[Octant::classify(&key, point).index()] += 1;
        }
    }
    let skew = config.skew(entries.len(), counts.iter().copied().filter(|&c| c > 0));
    (skew, counts.into_iter().max().unwrap_or(0))
}

fn sampled_pivots<V>(entries: &[(Point, V)]) -> Vec<usize> {
    let len = entries.len();
    let mut picks: Vec<usize> = (0..=BRANCHING).map(|k| k * (len - 1) / BRANCHING).collect();

    let centre = axis_median(entries);
    picks.extend(
        entries
            .iter()
            .enumerate()
            .min_by_key(|(_, (point, _))| point.manhattan(&centre))
            .map(|(i, _)| i),
    );
    picks.extend(Octant::all().filter_map(|octant| corner(entries, octant)));

    picks.sort_unstable();
    picks.dedup();
    picks
}

fn axis_median<V>(entries: &[(Point, V)]) -> Point {
    let mid = entries.len() / 2;
    let axis = |coord: fn(&Point) -> i64| -> i64 {
        let mut values: Vec<i64> = entries.iter().map(|(p, _)| coord(p)).collect();
        *values.select_nth_unstable(mid).1
    };
    Point::new(axis(|p| p.x), axis(|p| p.y), axis(|p| p.z))
}

/// The entry furthest out towards the corner named by `octant`.
fn corner<V>(entries: &[(Point, V)], octant: Octant) -> Option<usize> {
    let code = octant.code();
    let signed = |bit: u8, value: i64| {
        if code & bit != 0 {
            i128::from(value)
        } else {
            -i128::from(value)
        }
    };
    entries
        .iter()
        .enumerate()
        .max_by_key(|(_, (p, _))| signed(0b100, p.x) + signed(0b010, p.y) + signed(0b001, p.z))
        .map(|(i, _)| i)
}

fn violation(message: String) -> Error {
    log::warn!("octree invariant violated: {}", message);
    Error::InvariantViolation(message)
}
