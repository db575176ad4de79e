//! # Box Trees
//!
//! Trees are built bottom-up over the centres of the charge distributions. The finest level is a
//! uniform grid of `2^ns` cells per axis, each occupied cell becoming a leaf, and coarser levels
//! merge up to eight children sharing a parent grid index. Boxes are stored in an arena and refer
//! to each other by identifier.
//!
//! # Example Usage
//!
//! ```
//! use shellfmm::tree::BoxTree;
//! use shellfmm::traits::tree::SingleTree;
//!
//! let centres = vec![[0.5, 0.5, 0.5], [-0.5, 0.5, 0.5], [0.5, -0.5, -0.5]];
//! let extents = vec![0.; 3];
//! let tree = BoxTree::new(&centres, &extents, 2, 1).unwrap();
//! assert_eq!(tree.n_leaves(), 3);
//! ```
pub mod constants;
pub mod types;

mod domain;
pub mod helpers;
mod single_node;

pub use single_node::are_neighbours;
pub use types::{BoxSummary, BoxTree, Domain, FmmBox};
