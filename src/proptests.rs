use crate::config::Skew;
use crate::{Node, Octree, OctreeConfig, OrderStatTree, Point};

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

/// Structural checks on top of `Octree::validate`, through the public API.
fn validate_tree<V>(t: &Octree<V>) {
    t.validate().expect("tree must validate");

    let mut stack: Vec<&Node<V>> = t.root().into_iter().collect();
    let mut reachable = 0usize;
    while let Some(node) = stack.pop() {
        reachable += 1;
        let child_total: usize = node.children().map(|(_, c)| c.subtree_size()).sum();
        assert_eq!(
            node.subtree_size(),
            1 + child_total,
            "stored subtree size must match children"
        );
        for (octant, child) in node.children() {
            assert_eq!(
                node.child_for(child.key()).map(Node::key),
                Some(child.key()),
                "child must sit in its own octant ({:?})",
                octant
            );
            stack.push(child);
        }
    }
    assert_eq!(reachable, t.len(), "reachable nodes must match Octree::len");
    assert_eq!(t.iter().count(), t.len());
}

fn root_balanced<V>(t: &Octree<V>) -> bool {
    t.root().map_or(true, |root| {
        t.config().skew(
            root.subtree_size(),
            root.children().map(|(_, c)| c.subtree_size()),
        ) == Skew::Balanced
    })
}

/// Heaviest child within `balance_factor` times the lightest, for `node`.
fn sibling_ratio_holds<V>(node: &Node<V>, factor: usize) -> bool {
    let sizes: Vec<usize> = node.children().map(|(_, c)| c.subtree_size()).collect();
    match (sizes.iter().max(), sizes.iter().min()) {
        (Some(&max), Some(&min)) if sizes.len() >= 2 => max <= factor * min,
        _ => true,
    }
}

/// Sibling ratio on every node from the root down to `key`.
fn assert_path_balanced<V>(t: &Octree<V>, key: &Point) {
    let factor = t.config().balance_factor();
    let mut current = t.root();
    while let Some(node) = current {
        assert!(
            sibling_ratio_holds(node, factor),
            "node {} on the path to {} breaks the sibling ratio",
            node.key(),
            key
        );
        current = node.child_for(key);
    }
}

fn small_point() -> BoxedStrategy<Point> {
    (-6i64..6, -6i64..6, -6i64..6)
        .prop_map(Point::from)
        .boxed()
}

fn far_coord() -> BoxedStrategy<i64> {
    prop_oneof![-1000i64..-500, 500i64..1000].boxed()
}

/// Mostly a dense cluster, with the odd point far outside it.
fn scattered_point() -> BoxedStrategy<Point> {
    prop_oneof![
        8 => small_point(),
        1 => (far_coord(), far_coord(), far_coord()).prop_map(Point::from),
    ]
    .boxed()
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 3)]
    Insert(#[proptest(strategy = "small_point()")] Point, u32),
    Get(#[proptest(strategy = "small_point()")] Point),
}

#[derive(Clone, Debug, Arbitrary)]
enum RankOp {
    #[proptest(weight = 2)]
    Insert(#[proptest(strategy = "0u16..256")] u16),
    Remove(#[proptest(strategy = "0u16..256")] u16),
    Select(#[proptest(strategy = "1usize..64")] usize),
    Range(
        #[proptest(strategy = "0u16..256")] u16,
        #[proptest(strategy = "0u16..256")] u16,
    ),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_octree_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=600)) {
        let mut t: Octree<u32> = Octree::new();
        let mut m: BTreeMap<Point, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = t.insert(key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, Ok(old_m));
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key).ok(), m.get(&key));
                    prop_assert_eq!(t.contains(&key), m.contains_key(&key));
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let mut got: Vec<(Point, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        got.sort();
        let expected: Vec<(Point, u32)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_small_balance_factor(
        keys in prop::collection::vec(small_point(), 0..=300),
        factor in 1usize..=4,
    ) {
        let mut t = Octree::with_config(OctreeConfig::new().with_balance_factor(factor));
        let mut m = BTreeMap::new();
        for (i, key) in keys.into_iter().enumerate() {
            prop_assert_eq!(t.insert(key, i), Ok(m.insert(key, i)));
        }
        validate_tree(&t);
        for (key, value) in &m {
            prop_assert_eq!(t.get(key), Ok(value));
        }
    }

    #[test]
    fn prop_collinear_root_stays_balanced(
        n in 1usize..=400,
        axis in 0usize..3,
        step in 1i64..5,
    ) {
        let mut t = Octree::new();
        for i in 0..n as i64 {
            let mut coords = [3i64, -2, 9];
            coords[axis] = i * step;
            t.insert(Point::from(coords), i).unwrap();
            prop_assert!(root_balanced(&t), "root skewed after {} inserts", i + 1);
        }
        prop_assert_eq!(t.len(), n);
        if n > 8 {
            prop_assert!(t.rebuilds() >= 1);
        }
        validate_tree(&t);
    }

    #[test]
    fn prop_insertion_path_keeps_sibling_ratio(
        keys in prop::collection::vec(scattered_point(), 0..=300),
    ) {
        let mut t = Octree::new();
        for (i, key) in keys.iter().enumerate() {
            t.insert(*key, i).unwrap();
            assert_path_balanced(&t, key);
        }
        validate_tree(&t);
        for (key, _) in t.iter() {
            assert_path_balanced(&t, key);
        }
    }

    #[test]
    fn prop_outlier_beside_line(
        n in 1usize..=600,
        outlier in (far_coord(), far_coord(), far_coord()).prop_map(Point::from),
        first in any::<bool>(),
    ) {
        let line = |i: usize| Point::new(i as i64, 0, 0);
        let mut t = Octree::new();
        if first {
            t.insert(outlier, usize::MAX).unwrap();
        }
        for i in 0..n {
            t.insert(line(i), i).unwrap();
            assert_path_balanced(&t, &line(i));
        }
        if !first {
            t.insert(outlier, usize::MAX).unwrap();
            assert_path_balanced(&t, &outlier);
        }
        prop_assert_eq!(t.len(), n + 1);
        prop_assert!(t.rebuilds() <= n / 2 + 8, "{} rebuilds for {} inserts", t.rebuilds(), n + 1);
        validate_tree(&t);
    }

    #[test]
    fn prop_order_stat_equivalence(ops in prop::collection::vec(any::<RankOp>(), 0..=400)) {
        let mut t: OrderStatTree<u16, ()> = OrderStatTree::new();
        let mut m: BTreeMap<u16, ()> = BTreeMap::new();

        for op in ops {
            match op {
                RankOp::Insert(key) => {
                    let got = t.insert(key, ()).is_ok();
                    let expected = m.insert(key, ()).is_none();
                    prop_assert_eq!(got, expected);
                }
                RankOp::Remove(key) => {
                    prop_assert_eq!(t.remove(&key).ok(), m.remove(&key));
                }
                RankOp::Select(rank) => {
                    let got = t.kth_smallest(rank).ok().map(|(k, _)| *k);
                    let expected = m.keys().nth(rank.wrapping_sub(1)).copied();
                    prop_assert_eq!(got, expected);
                }
                RankOp::Range(a, b) => {
                    let got: Vec<u16> = t.range(&a, &b).into_iter().map(|(k, _)| *k).collect();
                    let expected: Vec<u16> = if a <= b {
                        m.range(a..=b).map(|(k, _)| *k).collect()
                    } else {
                        Vec::new()
                    };
                    prop_assert_eq!(got, expected);
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = vec![
        Point::new(0, 0, 0),
        Point::new(1, 0, 0),
        Point::new(2, 0, 0),
        Point::new(0, 1, 0),
        Point::new(0, 0, 1),
        Point::new(-1, -1, -1),
        Point::new(1, 1, 1),
    ];

    // A tight factor forces rebuilds for most orders.
    let config = OctreeConfig::new().with_balance_factor(1);
    for_each_permutation(&keys, |perm| {
        let mut t = Octree::with_config(config);
        let mut m = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            assert_eq!(t.insert(k, i), Ok(m.insert(k, i)));
            validate_tree(&t);
        }

        let mut got: Vec<(Point, usize)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        got.sort();
        let expected: Vec<(Point, usize)> = m.into_iter().collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_duplicate_reinsert_keeps_len() {
    let keys = vec![
        Point::new(5, 5, 5),
        Point::new(4, 6, 5),
        Point::new(6, 4, 5),
        Point::new(5, 5, 4),
        Point::new(3, 3, 3),
    ];

    for_each_permutation(&keys, |perm| {
        let mut t = Octree::new();
        for k in &keys {
            t.insert(*k, 0u8).unwrap();
        }
        for (i, k) in perm.into_iter().enumerate() {
            assert_eq!(t.insert(k, i as u8 + 1).map(|old| old.is_some()), Ok(true));
            assert_eq!(t.len(), keys.len());
            assert_eq!(t.get(&k), Ok(&(i as u8 + 1)));
        }
        validate_tree(&t);
    });
}
