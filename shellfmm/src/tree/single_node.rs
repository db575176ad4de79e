//! Implementation of constructors for box trees.
use std::collections::HashMap;

use itertools::Itertools;
use log::info;
use num::Integer;
use rayon::prelude::*;

use crate::{
    traits::tree::SingleTree,
    tree::{
        constants::MAX_SUBDIVISIONS,
        helpers::distance,
        types::{BoxSummary, BoxTree, Domain, FmmBox},
    },
};

/// Neighbour test between two boxes of one level, `|c_a - c_b| <= (1 + ws)(r_a + r_b)`. Boxes that
/// are not neighbours are well separated.
///
/// # Arguments
/// * `centre_a` - Centre of the first box.
/// * `extent_a` - Radius of the first box.
/// * `centre_b` - Centre of the second box.
/// * `extent_b` - Radius of the second box.
/// * `ws` - Well-separateness parameter.
pub fn are_neighbours(
    centre_a: &[f64; 3],
    extent_a: f64,
    centre_b: &[f64; 3],
    extent_b: f64,
    ws: u64,
) -> bool {
    distance(centre_a, centre_b) <= (1 + ws) as f64 * (extent_a + extent_b)
}

impl BoxTree {
    /// Constructor for box trees.
    ///
    /// # Arguments
    /// * `centres` - Centres of the charge distributions.
    /// * `extents` - Radii of the charge distributions, one per centre.
    /// * `ns` - Number of binary subdivisions of the domain at the finest level.
    /// * `ws` - Well-separateness parameter.
    pub fn new(
        centres: &[[f64; 3]],
        extents: &[f64],
        ns: u64,
        ws: u64,
    ) -> Result<BoxTree, std::io::Error> {
        if centres.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Empty set of charge distribution centres",
            ));
        }

        if centres.len() != extents.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "Found {} centres but {} extents",
                    centres.len(),
                    extents.len()
                ),
            ));
        }

        if ns > MAX_SUBDIVISIONS {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("ns={} exceeds the maximum of {}", ns, MAX_SUBDIVISIONS),
            ));
        }

        let domain = Domain::from_local_points(centres, ns);
        let mut tree = BoxTree::uniform_tree(centres, &domain, ws);
        tree.compute_geometry(centres, extents);
        tree.compute_adjacency();

        info!(
            "Box tree: box size {:.6}, unit size {:.6}, {} boxes, {} leaves, {} levels",
            domain.box_size,
            domain.unit_size,
            tree.boxes.len(),
            tree.n_leaves(),
            tree.nbranch.len()
        );

        Ok(tree)
    }

    /// Hash the centres into leaves on the finest grid, then merge levels upward until a level
    /// holds the coarsest boxes. Leaves are numbered in first seen order, parents in grid order.
    fn uniform_tree(centres: &[[f64; 3]], domain: &Domain, ws: u64) -> BoxTree {
        let ns = domain.ns;
        let n_cells = domain.n_cells();

        let mut boxes: Vec<FmmBox> = Vec::new();
        let mut child_map: HashMap<[i64; 3], usize> = HashMap::new();

        for (i, centre) in centres.iter().enumerate() {
            let key = domain.key(centre);
            assert!(
                key.iter().all(|k| (0..=n_cells).contains(k)),
                "Grid index {:?} outside of domain",
                key
            );

            let id = match child_map.get(&key) {
                Some(&id) => id,
                None => {
                    let id = boxes.len();
                    boxes.push(FmmBox {
                        id,
                        rank: 0,
                        key,
                        ..Default::default()
                    });
                    child_map.insert(key, id);
                    id
                }
            };
            boxes[id].members.push(i);
        }

        let mut nbranch = vec![boxes.len()];

        for nss in (0..=ns).rev() {
            let rank = ns - nss + 1;
            let mut parent_map: HashMap<[i64; 3], usize> = HashMap::new();
            let mut n_parents = 0;

            for (key, &child) in child_map.iter().sorted_by_key(|(key, _)| **key) {
                let parent_key = [
                    Integer::div_floor(&(key[0] + 1), &2),
                    Integer::div_floor(&(key[1] + 1), &2),
                    Integer::div_floor(&(key[2] + 1), &2),
                ];
                let members = boxes[child].members.clone();

                let parent = match parent_map.get(&parent_key) {
                    Some(&parent) => {
                        boxes[parent].children.push(child);
                        boxes[parent].members.extend(members);
                        parent
                    }
                    None => {
                        let parent = boxes.len();
                        boxes.push(FmmBox {
                            id: parent,
                            rank,
                            key: parent_key,
                            members,
                            children: vec![child],
                            ..Default::default()
                        });
                        parent_map.insert(parent_key, parent);
                        n_parents += 1;
                        parent
                    }
                };
                boxes[child].parent = Some(parent);
            }

            nbranch.push(n_parents);
            child_map = parent_map;
        }

        assert_eq!(
            nbranch.iter().sum::<usize>(),
            boxes.len(),
            "Box count does not match the per level branch counts"
        );

        let mut levels_to_boxes = HashMap::new();
        let mut start = 0;
        for (level, &n) in nbranch.iter().enumerate() {
            levels_to_boxes.insert(level as u64, (start, start + n));
            start += n;
        }

        BoxTree {
            boxes,
            nbranch,
            levels_to_boxes,
            domain: *domain,
            ws,
        }
    }

    /// Box centres and radii. Children always precede their parents in the arena.
    fn compute_geometry(&mut self, centres: &[[f64; 3]], extents: &[f64]) {
        for id in 0..self.boxes.len() {
            let n = self.boxes[id].members.len() as f64;
            let mut centre = [0f64; 3];
            for &m in self.boxes[id].members.iter() {
                for d in 0..3 {
                    centre[d] += centres[m][d];
                }
            }
            centre.iter_mut().for_each(|c| *c /= n);

            let extent = if self.boxes[id].children.is_empty() {
                self.boxes[id]
                    .members
                    .iter()
                    .map(|&m| distance(&centres[m], &centre) + extents[m])
                    .fold(0f64, f64::max)
            } else {
                self.boxes[id]
                    .children
                    .iter()
                    .map(|&c| distance(&self.boxes[c].centre, &centre) + self.boxes[c].extent)
                    .fold(0f64, f64::max)
            };

            self.boxes[id].centre = centre;
            self.boxes[id].extent = extent;
        }
    }

    /// Neighbour and interaction lists at every level.
    fn compute_adjacency(&mut self) {
        for level in 0..self.nbranch.len() as u64 {
            let (start, end) = self.levels_to_boxes[&level];

            let lists: Vec<(Vec<usize>, Vec<usize>)> = (start..end)
                .into_par_iter()
                .map(|a| {
                    let mut neighbours = Vec::new();
                    let mut interactions = Vec::new();
                    for b in start..end {
                        if self.is_neighbour(a, b) {
                            neighbours.push(b);
                        } else {
                            let parents_adjacent =
                                match (self.boxes[a].parent, self.boxes[b].parent) {
                                    (Some(pa), Some(pb)) => self.is_neighbour(pa, pb),
                                    _ => true,
                                };
                            if parents_adjacent {
                                interactions.push(b);
                            }
                        }
                    }
                    (neighbours, interactions)
                })
                .collect();

            for (id, (neighbours, interactions)) in (start..end).zip(lists) {
                self.boxes[id].neighbours = neighbours;
                self.boxes[id].interactions = interactions;
            }
        }
    }

    /// Whether two boxes of the same level fail the well-separateness test.
    pub fn is_neighbour(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.boxes[a], &self.boxes[b]);
        are_neighbours(&a.centre, a.extent, &b.centre, b.extent, self.ws)
    }

    /// Position of a box within its level, the index used for round-robin work distribution.
    pub fn position_in_level(&self, id: usize) -> usize {
        let (start, _) = self.levels_to_boxes[&self.boxes[id].rank];
        id - start
    }

    /// Whether any box at any level has a non-empty interaction list. If not, the system is purely
    /// near field and all far field passes can be skipped.
    pub fn do_far_field(&self) -> bool {
        self.boxes.iter().any(|b| !b.interactions.is_empty())
    }

    /// Whether any leaf has a non-empty interaction list.
    pub fn finest_level_has_interactions(&self) -> bool {
        self.leaves().iter().any(|b| !b.interactions.is_empty())
    }

    /// Per box description of the tree.
    pub fn summary(&self) -> Vec<BoxSummary> {
        self.boxes
            .iter()
            .map(|b| BoxSummary {
                id: b.id,
                rank: b.rank,
                extent: b.extent,
                n_children: b.children.len(),
                n_neighbours: b.neighbours.len(),
                n_interactions: b.interactions.len(),
                centre: b.centre,
            })
            .collect()
    }
}

impl SingleTree for BoxTree {
    type Node = FmmBox;

    fn depth(&self) -> u64 {
        (self.nbranch.len() - 1) as u64
    }

    fn n_boxes(&self) -> usize {
        self.boxes.len()
    }

    fn n_leaves(&self) -> usize {
        self.nbranch[0]
    }

    fn n_boxes_at(&self, level: u64) -> Option<usize> {
        self.nbranch.get(level as usize).copied()
    }

    fn level_range(&self, level: u64) -> Option<std::ops::Range<usize>> {
        self.levels_to_boxes
            .get(&level)
            .map(|&(start, end)| start..end)
    }

    fn all_boxes(&self) -> &[Self::Node] {
        &self.boxes
    }

    fn boxes_at(&self, level: u64) -> Option<&[Self::Node]> {
        self.level_range(level).map(|range| &self.boxes[range])
    }

    fn members(&self, index: usize) -> Option<&[usize]> {
        self.boxes.get(index).map(|b| b.members.as_slice())
    }

    fn neighbours(&self, index: usize) -> Option<&[usize]> {
        self.boxes.get(index).map(|b| b.neighbours.as_slice())
    }

    fn interactions(&self, index: usize) -> Option<&[usize]> {
        self.boxes.get(index).map(|b| b.interactions.as_slice())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;
    use crate::tree::helpers::{cube_corners, points_fixture};

    fn random_tree(n_points: usize, ns: u64, ws: u64) -> BoxTree {
        let points = points_fixture(n_points, Some(-1.0), Some(1.0), None);
        let extents = vec![0.01; n_points];
        BoxTree::new(&points, &extents, ns, ws).unwrap()
    }

    #[test]
    pub fn test_leaves_partition_centres() {
        let n_points = 300;
        let tree = random_tree(n_points, 3, 1);

        let mut seen = vec![0usize; n_points];
        for leaf in tree.leaves() {
            assert!(!leaf.members.is_empty());
            assert!(leaf.children.is_empty());
            for &m in leaf.members.iter() {
                seen[m] += 1;
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    pub fn test_parent_members_are_union_of_children() {
        let tree = random_tree(300, 3, 1);

        for b in tree.all_boxes().iter().filter(|b| !b.children.is_empty()) {
            let mut expected = b
                .children
                .iter()
                .flat_map(|&c| tree.boxes[c].members.iter().cloned())
                .collect_vec();
            let mut found = b.members.clone();
            expected.sort();
            found.sort();
            assert_eq!(expected, found);

            for &c in b.children.iter() {
                assert_eq!(tree.boxes[c].parent, Some(b.id));
                assert_eq!(tree.boxes[c].rank + 1, b.rank);
            }
        }

        // The coarsest level holds every centre
        let top: usize = tree
            .boxes_at(tree.depth())
            .unwrap()
            .iter()
            .map(|b| b.members.len())
            .sum();
        assert_eq!(top, 300);
    }

    #[test]
    pub fn test_levels_are_contiguous() {
        let tree = random_tree(200, 4, 1);
        assert_eq!(tree.nbranch.iter().sum::<usize>(), tree.n_boxes());
        assert_eq!(tree.depth(), 5);

        for level in 0..=tree.depth() {
            let range = tree.level_range(level).unwrap();
            assert_eq!(range.len(), tree.n_boxes_at(level).unwrap());
            for (position, b) in tree.boxes_at(level).unwrap().iter().enumerate() {
                assert_eq!(b.rank, level);
                assert_eq!(tree.position_in_level(b.id), position);
            }
        }
        assert!(tree.boxes_at(tree.depth() + 1).is_none());
    }

    #[test]
    pub fn test_neighbours_and_interactions_are_disjoint() {
        for ws in 1..=3 {
            let tree = random_tree(200, 3, ws);

            for level in 0..=tree.depth() {
                let range = tree.level_range(level).unwrap();
                for a in range.clone() {
                    let neighbours: HashSet<usize> =
                        tree.neighbours(a).unwrap().iter().cloned().collect();
                    let interactions: HashSet<usize> =
                        tree.interactions(a).unwrap().iter().cloned().collect();

                    assert!(neighbours.contains(&a));
                    assert!(neighbours.is_disjoint(&interactions));

                    for b in range.clone() {
                        // Exactly one of neighbour, interaction or neither, symmetrically
                        assert_eq!(
                            neighbours.contains(&b),
                            tree.neighbours(b).unwrap().contains(&a)
                        );
                        assert_eq!(
                            interactions.contains(&b),
                            tree.interactions(b).unwrap().contains(&a)
                        );
                    }
                }
            }
        }
    }

    #[test]
    pub fn test_every_leaf_pair_counted_once() {
        for ws in 1..=3 {
            let tree = random_tree(150, 3, ws);

            for a in tree.level_range(0).unwrap() {
                for b in tree.level_range(0).unwrap() {
                    let near = tree.neighbours(a).unwrap().contains(&b);

                    let mut n_far = 0;
                    let (mut pa, mut pb) = (Some(a), Some(b));
                    while let (Some(x), Some(y)) = (pa, pb) {
                        if tree.interactions(x).unwrap().contains(&y) {
                            n_far += 1;
                        }
                        pa = tree.boxes[x].parent;
                        pb = tree.boxes[y].parent;
                    }

                    if near {
                        assert_eq!(n_far, 0);
                    } else {
                        assert_eq!(n_far, 1);
                    }
                }
            }
        }
    }

    #[test]
    pub fn test_cube_corners_single_subdivision() {
        let corners = cube_corners(1.0);
        let tree = BoxTree::new(&corners, &[0.; 8], 1, 1).unwrap();

        // Every corner falls in the same cell at this resolution
        assert_eq!(tree.nbranch, vec![1, 1, 1]);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.leaves()[0].members.len(), 8);
        assert!(!tree.do_far_field());
        assert!(!tree.finest_level_has_interactions());
    }

    #[test]
    pub fn test_cube_corners_two_subdivisions() {
        let corners = cube_corners(1.0);
        let tree = BoxTree::new(&corners, &[0.; 8], 2, 1).unwrap();

        assert_eq!(tree.nbranch, vec![8, 8, 1, 1]);
        assert!(tree.leaves().iter().all(|b| b.members.len() == 1));
        assert!(tree.leaves().iter().all(|b| b.interactions.is_empty()));

        for b in tree.boxes_at(1).unwrap() {
            assert_eq!(b.interactions.len(), 7);
            assert_eq!(b.neighbours, vec![b.id]);
        }

        assert!(tree.do_far_field());
        assert!(!tree.finest_level_has_interactions());

        let summary = tree.summary();
        assert_eq!(summary.len(), 18);
        assert_eq!(summary[8].n_interactions, 7);
        assert_eq!(summary[16].n_children, 8);
    }

    #[test]
    pub fn test_parent_keys_halve_child_keys() {
        let tree = random_tree(250, 4, 1);

        for b in tree.all_boxes().iter().filter(|b| b.parent.is_some()) {
            let parent = &tree.boxes[b.parent.unwrap()];
            for d in 0..3 {
                assert_eq!(parent.key[d], (b.key[d] + 1) / 2);
            }
        }

        // Distinct parents never share a grid index
        for level in 1..=tree.depth() {
            let keys: HashSet<[i64; 3]> =
                tree.boxes_at(level).unwrap().iter().map(|b| b.key).collect();
            assert_eq!(keys.len(), tree.n_boxes_at(level).unwrap());
        }
    }

    #[test]
    pub fn test_invalid_input() {
        assert!(BoxTree::new(&[], &[], 2, 1).is_err());
        assert!(BoxTree::new(&[[0., 0., 0.]], &[], 2, 1).is_err());
        assert!(BoxTree::new(&[[0., 0., 0.]], &[0.], MAX_SUBDIVISIONS + 1, 1).is_err());
    }
}
