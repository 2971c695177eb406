//! Insertion orders that keep an [`Octree`](crate::Octree) shallow.

use crate::config::BRANCHING;
use crate::error::{Error, Result};
use crate::ostree::OrderStatTree;
use crate::point::{Octant, Point};

/// Reorder `points` so that inserting them in sequence builds a
/// median-rooted octree level by level.
///
/// Duplicates are dropped. The lexicographic median comes first, followed by
/// the orderings of each octant group around it, in octant order. The
/// order-statistic tree used for deduplication is unbalanced, so an input
/// that is already sorted costs quadratic time.
pub fn balanced_order(points: &[Point]) -> Result<Vec<Point>> {
    let mut distinct = OrderStatTree::new();
    for &point in points {
        match distinct.insert(point, ()) {
            Ok(()) | Err(Error::DuplicateKey) => {}
            Err(err) => return Err(err),
        }
    }
    if distinct.is_empty() {
        return Ok(Vec::new());
    }

    let (&median, _) = distinct.kth_smallest(distinct.len() / 2 + 1)?;
    let sorted: Vec<Point> = distinct.iter().map(|(point, _)| *point).collect();
    let mut out = Vec::with_capacity(sorted.len());
    emit(median, &sorted, &mut out);
    Ok(out)
}

fn emit(pivot: Point, sorted: &[Point], out: &mut Vec<Point>) {
    out.push(pivot);
    let mut groups: [Vec<Point>; BRANCHING] = Default::default();
    for point in sorted {
        if let Some(octant) = Octant::of(&pivot, point) {
            groups[octant.index()].push(*point);
        }
    }
    for group in groups.iter().filter(|group| !group.is_empty()) {
        emit(group[group.len() / 2], group, out);
    }
}
