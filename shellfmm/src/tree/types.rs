//! Data structures for box trees.
use std::collections::HashMap;

/// The cubic domain enclosing all charge distribution centres, centred on the origin, and its
/// subdivision into a uniform grid at the finest level.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Domain {
    /// Side length of the domain.
    pub box_size: f64,

    /// Side length of a finest level grid cell.
    pub unit_size: f64,

    /// Number of binary subdivisions at the finest level.
    pub ns: u64,
}

/// A node of a box tree.
///
/// Leaves have rank 0. Every box holds the indices of all charge distributions beneath it, so that
/// a parent's members are the union of its children's members.
#[derive(Debug, Clone, Default)]
pub struct FmmBox {
    /// Unique identifier, the position of this box in the tree's arena.
    pub id: usize,

    /// Level of the box, 0 at the finest level.
    pub rank: u64,

    /// Integer grid index at this box's level.
    pub key: [i64; 3],

    /// Indices of the charge distributions contained in this box.
    pub members: Vec<usize>,

    /// Mean of the member centres, the expansion centre of the box.
    pub centre: [f64; 3],

    /// Radius about `centre` enclosing the extents of all members.
    pub extent: f64,

    /// Identifier of the parent, `None` at the coarsest level.
    pub parent: Option<usize>,

    /// Identifiers of the children, empty for leaves.
    pub children: Vec<usize>,

    /// Same level boxes failing the well-separateness test, including this box.
    pub neighbours: Vec<usize>,

    /// Same level boxes passing the well-separateness test whose parents are neighbours.
    pub interactions: Vec<usize>,
}

/// A box tree over a set of charge distribution centres, with boxes stored contiguously by level
/// from the finest level upwards.
///
/// # Fields
/// - `boxes` - Arena of all boxes, indexed by identifier.
///
/// - `nbranch` - Number of boxes at each level, `nbranch[rank]`.
///
/// - `levels_to_boxes` - Associates a level with its half open range of box identifiers.
///
/// - `domain` - The domain and finest level grid.
///
/// - `ws` - Well-separateness parameter used for the neighbour lists.
#[derive(Debug, Clone, Default)]
pub struct BoxTree {
    /// Arena of all boxes, indexed by identifier.
    pub boxes: Vec<FmmBox>,

    /// Number of boxes at each level.
    pub nbranch: Vec<usize>,

    /// Associate levels with box identifier ranges.
    pub levels_to_boxes: HashMap<u64, (usize, usize)>,

    /// Domain spanned by the centres.
    pub domain: Domain,

    /// Well-separateness parameter.
    pub ws: u64,
}

/// One line description of a box, as reported by [`BoxTree::summary`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSummary {
    /// Box identifier
    pub id: usize,

    /// Level of the box
    pub rank: u64,

    /// Radius of the box
    pub extent: f64,

    /// Number of children
    pub n_children: usize,

    /// Number of neighbours
    pub n_neighbours: usize,

    /// Number of interactions
    pub n_interactions: usize,

    /// Box centre
    pub centre: [f64; 3],
}
