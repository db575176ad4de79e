//! Tree Traits
use std::ops::Range;

/// Box trees on a single worker, stored as an arena indexed by box identifier.
///
/// Levels are numbered by rank, 0 being the finest level holding the leaves.
pub trait SingleTree {
    /// A tree node.
    type Node;

    /// Rank of the coarsest level.
    fn depth(&self) -> u64;

    /// Total number of boxes
    fn n_boxes(&self) -> usize;

    /// Number of leaves
    fn n_leaves(&self) -> usize;

    /// Number of boxes at a given level
    fn n_boxes_at(&self, level: u64) -> Option<usize>;

    /// Range of box identifiers occupied by a level, boxes of a level are contiguous.
    fn level_range(&self, level: u64) -> Option<Range<usize>>;

    /// Get a reference to all boxes, in identifier order.
    fn all_boxes(&self) -> &[Self::Node];

    /// Get a reference to the boxes at a given level.
    fn boxes_at(&self, level: u64) -> Option<&[Self::Node]>;

    /// Get a reference to the leaves.
    fn leaves(&self) -> &[Self::Node] {
        self.boxes_at(0).unwrap_or(&[])
    }

    /// Charge distributions contained in a box.
    ///
    /// # Arguments
    /// - `index` - box identifier being queried.
    fn members(&self, index: usize) -> Option<&[usize]>;

    /// Same level boxes failing the well-separateness test, including the box itself.
    fn neighbours(&self, index: usize) -> Option<&[usize]>;

    /// Same level boxes that are well separated but whose parents are neighbours.
    fn interactions(&self, index: usize) -> Option<&[usize]>;
}
