//! Percentile band queries over an [`OrderStatTree`].

use crate::error::{Error, Result};
use crate::ostree::OrderStatTree;

/// A set of points supporting "everything between two percentiles" queries.
#[derive(Clone, Debug)]
pub struct Percentiles<T> {
    store: OrderStatTree<T, ()>,
}

impl<T: Ord + Clone> Percentiles<T> {
    pub fn new() -> Self {
        Self {
            store: OrderStatTree::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Fails with [`Error::DuplicateKey`] if the point is already present.
    pub fn add_point(&mut self, point: T) -> Result<()> {
        self.store.insert(point, ())
    }

    pub fn remove_point(&mut self, point: &T) -> Result<()> {
        self.store.remove(point)
    }

    /// Points above the bottom `x` percent and below the top `y` percent, in
    /// order.
    ///
    /// With `n` points the band runs from rank `ceil(x * n / 100) + 1` to rank
    /// `n - floor(y * n / 100)`. An empty band yields an empty vector.
    pub fn ratio(&self, x: u32, y: u32) -> Result<Vec<T>> {
        for pct in [x, y] {
            if pct > 100 {
                return Err(Error::PercentileOutOfRange(pct));
            }
        }

        let n = self.len();
        let bottom = (x as usize * n).div_ceil(100) + 1;
        let top = n - (y as usize * n) / 100;
        if bottom > top || bottom > n {
            return Ok(Vec::new());
        }

        let (low, _) = self.store.kth_smallest(bottom)?;
        let (high, _) = self.store.kth_smallest(top)?;
        Ok(self
            .store
            .range(low, high)
            .into_iter()
            .map(|(point, _)| point.clone())
            .collect())
    }
}

impl<T: Ord + Clone> Default for Percentiles<T> {
    fn default() -> Self {
        Self::new()
    }
}
