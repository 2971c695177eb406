//! # weighted-octree
//!
//! A weight-balanced octree keyed by integer points.
//!
//! Each node holds one key and routes every other key into one of eight
//! children by comparing coordinates. Subtree sizes are tracked on every
//! node; when an insertion leaves a subtree skewed, that subtree is rebuilt
//! around its median instead of being rotated.
//!
//! The crate also carries the structures that usually travel with the index:
//! an order-statistic tree ([`OrderStatTree`]) and its percentile wrapper
//! ([`Percentiles`]), a bounded max-heap with a hive harvesting scheduler
//! ([`HiveSelector`]), and an insertion-order heuristic
//! ([`balanced_order`]).
//!
//! ## Example
//!
//! ```rust
//! use weighted_octree::{Octree, Point};
//!
//! let mut tree: Octree<&str> = Octree::new();
//! tree.insert(Point::new(3, 3, 3), "A").unwrap();
//! tree.insert(Point::new(4, 3, 1), "C").unwrap();
//! tree.insert(Point::new(5, 4, 0), "D").unwrap();
//!
//! assert_eq!(tree.get(&Point::new(5, 4, 0)), Ok(&"D"));
//! assert_eq!(tree.insert(Point::new(5, 4, 0), "E").unwrap(), Some("D"));
//! assert_eq!(tree.len(), 3);
//!
//! let c = tree.root().and_then(|r| r.child_for(&Point::new(4, 3, 1))).unwrap();
//! assert_eq!(c.subtree_size(), 2);
//! ```

pub mod config;
pub mod error;
pub mod harvest;
pub mod octree;
pub mod ordering;
pub mod ostree;
pub mod percentile;
pub mod point;

pub use config::OctreeConfig;
pub use error::{Error, Result};
pub use harvest::{BoundedMaxHeap, Hive, HiveSelector};
pub use octree::{Node, Octree};
pub use ordering::balanced_order;
pub use ostree::OrderStatTree;
pub use percentile::Percentiles;
pub use point::{Octant, Point};

#[cfg(test)]
mod proptests;
