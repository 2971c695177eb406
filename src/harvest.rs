//! Bounded max-priority selection and the hive harvesting scheduler built on
//! it.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{Error, Result};
use crate::point::Point;

// =============================================================================
// Bounded heap
// =============================================================================

/// A max-heap that refuses to grow past a fixed capacity.
#[derive(Clone, Debug)]
pub struct BoundedMaxHeap<T> {
    heap: BinaryHeap<T>,
    capacity: usize,
}

impl<T: Ord> BoundedMaxHeap<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            capacity,
        }
    }

    /// Heapify `items` in one pass. Fails if they do not fit in `capacity`.
    pub fn from_vec(capacity: usize, items: Vec<T>) -> Result<Self> {
        if items.len() > capacity {
            return Err(Error::CapacityExceeded { capacity });
        }
        let mut heap = BinaryHeap::from(items);
        heap.reserve(capacity - heap.len());
        Ok(Self { heap, capacity })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, item: T) -> Result<()> {
        if self.heap.len() >= self.capacity {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.heap.push(item);
        Ok(())
    }

    pub fn peek(&self) -> Option<&T> {
        self.heap.peek()
    }

    pub fn pop_max(&mut self) -> Result<T> {
        self.heap.pop().ok_or(Error::Empty)
    }
}

// =============================================================================
// Hives
// =============================================================================

/// A harvestable site at a point in space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hive {
    pub position: Point,
    /// Most units that can be taken in one harvest.
    pub capacity: u64,
    pub nutrient_factor: u64,
    /// Units currently stored.
    pub volume: u64,
}

impl Hive {
    pub fn new(position: Point, capacity: u64, nutrient_factor: u64) -> Self {
        Self {
            position,
            capacity,
            nutrient_factor,
            volume: 0,
        }
    }

    pub fn with_volume(mut self, volume: u64) -> Self {
        self.volume = volume;
        self
    }

    /// What the next harvest of this hive would return.
    pub fn yield_value(&self) -> u64 {
        self.nutrient_factor
            .saturating_mul(self.volume.min(self.capacity))
    }
}

impl Ord for Hive {
    fn cmp(&self, other: &Self) -> Ordering {
        self.yield_value()
            .cmp(&other.yield_value())
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.capacity.cmp(&other.capacity))
            .then_with(|| self.nutrient_factor.cmp(&other.nutrient_factor))
            .then_with(|| self.volume.cmp(&other.volume))
    }
}

impl PartialOrd for Hive {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Always harvests the hive with the best yield.
#[derive(Clone, Debug)]
pub struct HiveSelector {
    hives: BoundedMaxHeap<Hive>,
}

impl HiveSelector {
    pub fn new(max_hives: usize) -> Self {
        Self {
            hives: BoundedMaxHeap::new(max_hives),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hives.is_empty()
    }

    /// Replace every tracked hive, keeping the selector's capacity.
    pub fn set_all_hives(&mut self, hives: Vec<Hive>) -> Result<()> {
        self.hives = BoundedMaxHeap::from_vec(self.hives.capacity(), hives)?;
        Ok(())
    }

    pub fn add_hive(&mut self, hive: Hive) -> Result<()> {
        self.hives.push(hive)
    }

    /// Harvest the best hive and return what it produced.
    ///
    /// At most `capacity` units are taken; the hive goes back with whatever
    /// volume remains.
    pub fn harvest_best_hive(&mut self) -> Result<u64> {
        let mut best = self.hives.pop_max()?;
        let units = best.volume.min(best.capacity);
        best.volume -= units;
        let produced = best.nutrient_factor.saturating_mul(units);
        log::trace!(
            "harvested {} units at {} for {}",
            units,
            best.position,
            produced
        );
        // The slot freed by `pop_max` is still open.
        self.hives.heap.push(best);
        Ok(produced)
    }
}
