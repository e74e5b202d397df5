//! Kd-tree construction with a surface-area-heuristic split sweep.

use crate::node::{Axis, EMPTY_CHILD, KdNode, KdTree};
use crate::triple::{ExtentTriple, TripleArena, TripleKind, push_extent, sort_triples};
use thiserror::Error;
use tracing::debug;
use vmath::Aabb;

/// Slots per object per axis reserved for split-straddling duplicates
/// (`m / (1 - m)` with an expected overlap fraction `m = 1/5`).
pub const EXTENT_TRIPLE_STORAGE_MULTIPLIER: usize = 4;

/// Hard recursion depth cap.
const MAX_DEPTH: u32 = 50;

#[derive(Error, Debug)]
pub enum KdBuildError {
    #[error(
        "extent-triple storage exhausted (high water {high_water} of {limit}); \
         raise the storage multiplier and rebuild"
    )]
    StorageExhausted { high_water: usize, limit: usize },
}

/// Cost model for testing a ray against one object, in units of the cost of
/// traversing an internal tree node.
pub enum ObjectCost {
    Constant(f64),
    PerObject(Box<dyn Fn(usize) -> f64 + Send + Sync>),
}

impl ObjectCost {
    fn of(&self, object: usize) -> f64 {
        match self {
            ObjectCost::Constant(c) => *c,
            ObjectCost::PerObject(f) => f(object),
        }
    }
}

/// Split cost function selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAlgorithm {
    /// MacDonald-Booth surface-area heuristic.
    MacDonaldBooth,
    /// Surface-area heuristic with an empty-side discount.
    MacDonaldBoothModifiedCoefs,
    /// Double-recursion estimate with Goldsmith-Salmon coefficients.
    DoubleRecurse,
    /// Double-recursion estimate with adjusted coefficients.
    DoubleRecurseModifiedCoefs,
}

/// Returns the AABB of object `i` clipped by a box, or `None` when the
/// intersection is empty (zero-area contacts may also report empty).
pub type ExtentInBoxFn<'a> = dyn Fn(usize, &Aabb) -> Option<Aabb> + 'a;

pub struct KdTreeBuilder {
    split_algorithm: SplitAlgorithm,
    object_cost: ObjectCost,
    stopping_cost_per_ray: f64,
    storage_multiplier: usize,
}

impl Default for KdTreeBuilder {
    fn default() -> Self {
        Self {
            split_algorithm: SplitAlgorithm::MacDonaldBooth,
            object_cost: ObjectCost::Constant(4.0),
            stopping_cost_per_ray: 4.0 / 1.0e6,
            storage_multiplier: EXTENT_TRIPLE_STORAGE_MULTIPLIER,
        }
    }
}

impl KdTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_split_algorithm(&mut self, algorithm: SplitAlgorithm) -> &mut Self {
        self.split_algorithm = algorithm;
        self
    }

    pub fn set_object_cost(&mut self, cost: ObjectCost) -> &mut Self {
        self.object_cost = cost;
        self
    }

    /// The benefit (in node-traversal units, per expected ray) required to
    /// justify a new tree node.
    pub fn set_stopping_criterion(&mut self, num_rays: u64, num_accesses: f64) -> &mut Self {
        self.stopping_cost_per_ray = num_accesses / num_rays as f64;
        self
    }

    /// Raise this and rebuild after a `StorageExhausted` failure.
    pub fn set_storage_multiplier(&mut self, multiplier: usize) -> &mut Self {
        self.storage_multiplier = multiplier;
        self
    }

    /// Build the tree over `num_objects` objects.
    pub fn build(
        &self,
        num_objects: usize,
        extent_fn: &dyn Fn(usize) -> Aabb,
        extent_in_box_fn: Option<&ExtentInBoxFn<'_>>,
    ) -> Result<KdTree, KdBuildError> {
        let mut object_aabbs = Vec::with_capacity(num_objects);
        let mut bounding_box = Aabb::empty_growable();
        for i in 0..num_objects {
            let aabb = extent_fn(i);
            bounding_box.enlarge_to_contain(&aabb);
            object_aabbs.push(aabb);
        }
        if num_objects == 0 {
            bounding_box = Aabb::new(glam::DVec3::ZERO, glam::DVec3::ZERO);
        }

        let per_axis_limit = 3 * self.storage_multiplier * num_objects.max(1);
        let mut state = BuildState {
            builder: self,
            nodes: Vec::new(),
            object_aabbs: &object_aabbs,
            extent_in_box: extent_in_box_fn,
            arena: TripleArena::new(3 * per_axis_limit),
            total_object_cost: 0.0,
        };

        // Root triple lists from the unclipped extents
        let mut root_triples: [Vec<ExtentTriple>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        let mut total_cost = 0.0;
        for (id, aabb) in object_aabbs.iter().enumerate() {
            if aabb.is_empty() {
                continue;
            }
            for axis in 0..3 {
                push_extent(
                    &mut root_triples[axis],
                    aabb.min_on_axis(axis),
                    aabb.max_on_axis(axis),
                    id as u32,
                );
            }
            total_cost += self.object_cost.of(id);
        }
        for list in &mut root_triples {
            sort_triples(list);
        }
        let root_lease: usize = root_triples.iter().map(Vec::len).sum();
        if !state.arena.reserve(root_lease) {
            return Err(KdBuildError::StorageExhausted {
                high_water: state.arena.high_water(),
                limit: state.arena.limit(),
            });
        }
        state.total_object_cost = total_cost;

        state.build_subtree(EMPTY_CHILD, bounding_box, total_cost, root_triples, 0)?;

        debug!(
            nodes = state.nodes.len(),
            objects = num_objects,
            triple_high_water = state.arena.high_water(),
            "kd-tree built"
        );

        Ok(KdTree {
            nodes: state.nodes,
            bounding_box,
            num_objects,
        })
    }
}

/// Best split candidate found by the sweep.
struct SplitChoice {
    axis: usize,
    value: f64,
    /// Triples `[0, num_triples_left)` of the axis list belong to the left
    /// segment.
    num_triples_left: usize,
    cost: f64,
}

struct BuildState<'a> {
    builder: &'a KdTreeBuilder,
    nodes: Vec<KdNode>,
    object_aabbs: &'a [Aabb],
    extent_in_box: Option<&'a ExtentInBoxFn<'a>>,
    arena: TripleArena,
    total_object_cost: f64,
}

impl BuildState<'_> {
    /// Build the subtree for one node; returns its index in the node array.
    fn build_subtree(
        &mut self,
        parent: i32,
        aabb: Aabb,
        total_cost: f64,
        triples: [Vec<ExtentTriple>; 3],
        depth: u32,
    ) -> Result<i32, KdBuildError> {
        let node_index = self.nodes.len() as i32;

        let choice = if depth < MAX_DEPTH {
            self.calc_best_split(&aabb, total_cost, &triples)
        } else {
            None
        };

        let Some(choice) = choice else {
            let lease: usize = triples.iter().map(Vec::len).sum();
            let mut objects: Vec<u32> = triples[0]
                .iter()
                .filter(|t| t.kind != TripleKind::Max)
                .map(|t| t.object_id)
                .collect();
            objects.sort_unstable();
            self.nodes.push(KdNode::Leaf { objects, parent });
            self.arena.release(lease);
            return Ok(node_index);
        };

        // Left/right membership from the sweep position: an object is on a
        // side iff it has an event in that segment.
        let axis = choice.axis;
        let num_node_objects = triples[axis]
            .iter()
            .filter(|t| t.kind != TripleKind::Max)
            .count();
        let mut left_ids = Vec::with_capacity(num_node_objects);
        let mut right_ids = Vec::with_capacity(num_node_objects);
        for (idx, triple) in triples[axis].iter().enumerate() {
            let left_segment = idx < choice.num_triples_left;
            match triple.kind {
                TripleKind::Min | TripleKind::Flat => {
                    if left_segment {
                        left_ids.push(triple.object_id);
                    } else {
                        right_ids.push(triple.object_id);
                    }
                }
                TripleKind::Max => {
                    if !left_segment {
                        // Straddles the split: its min was recorded left
                        right_ids.push(triple.object_id);
                    }
                }
            }
        }

        let mut left_aabb = aabb;
        left_aabb.max[axis] = choice.value;
        let mut right_aabb = aabb;
        right_aabb.min[axis] = choice.value;

        let (left_triples, left_cost, left_count) = self.make_child_lists(&left_ids, &left_aabb);
        let (right_triples, right_cost, right_count) =
            self.make_child_lists(&right_ids, &right_aabb);

        let child_lease: usize = left_triples.iter().map(Vec::len).sum::<usize>()
            + right_triples.iter().map(Vec::len).sum::<usize>();
        if !self.arena.reserve(child_lease) {
            return Err(KdBuildError::StorageExhausted {
                high_water: self.arena.high_water().max(child_lease),
                limit: self.arena.limit(),
            });
        }

        // The parent's lists are no longer needed
        let parent_lease: usize = triples.iter().map(Vec::len).sum();
        drop(triples);
        self.arena.release(parent_lease);

        self.nodes.push(KdNode::Split {
            axis: Axis::from_index(axis),
            split_value: choice.value,
            left: EMPTY_CHILD,
            right: EMPTY_CHILD,
            parent,
        });

        let left_index = if left_count > 0 {
            self.build_subtree(node_index, left_aabb, left_cost, left_triples, depth + 1)?
        } else {
            self.arena
                .release(left_triples.iter().map(Vec::len).sum::<usize>());
            EMPTY_CHILD
        };
        let right_index = if right_count > 0 {
            self.build_subtree(node_index, right_aabb, right_cost, right_triples, depth + 1)?
        } else {
            self.arena
                .release(right_triples.iter().map(Vec::len).sum::<usize>());
            EMPTY_CHILD
        };

        if let KdNode::Split { left, right, .. } = &mut self.nodes[node_index as usize] {
            *left = left_index;
            *right = right_index;
        }
        Ok(node_index)
    }

    /// Triple lists for one child box, with the summed object cost and the
    /// number of objects that actually reach the box.
    fn make_child_lists(
        &self,
        ids: &[u32],
        child_aabb: &Aabb,
    ) -> ([Vec<ExtentTriple>; 3], f64, usize) {
        let mut lists: [Vec<ExtentTriple>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        let mut cost = 0.0;
        let mut count = 0;
        for &id in ids {
            let clipped = match self.extent_in_box {
                Some(f) => f(id as usize, child_aabb),
                None => {
                    let isect = self.object_aabbs[id as usize].intersection(child_aabb);
                    if isect.is_empty() { None } else { Some(isect) }
                }
            };
            let Some(mut ext) = clipped else {
                continue;
            };
            ext.clamp_to(child_aabb);
            for axis in 0..3 {
                push_extent(
                    &mut lists[axis],
                    ext.min_on_axis(axis),
                    ext.max_on_axis(axis),
                    id,
                );
            }
            cost += self.builder.object_cost.of(id as usize);
            count += 1;
        }
        for list in &mut lists {
            sort_triples(list);
        }
        (lists, cost, count)
    }

    /// Sweep all three axes for the cheapest split; `None` keeps the leaf.
    fn calc_best_split(
        &self,
        aabb: &Aabb,
        total_cost: f64,
        triples: &[Vec<ExtentTriple>; 3],
    ) -> Option<SplitChoice> {
        let extent = aabb.extent();
        let cost_to_beat = total_cost - self.builder.stopping_cost_per_ray;
        let mut best: Option<SplitChoice> = None;

        for axis in 0..3 {
            if extent[axis] <= 0.0 {
                continue;
            }
            let (second, third) = match axis {
                0 => (extent.y, extent.z),
                1 => (extent.z, extent.x),
                _ => (extent.x, extent.y),
            };
            let end_area = 2.0 * second * third;
            let wrap = 2.0 * (second + third);
            let node_area = end_area + wrap * extent[axis];
            if node_area <= 0.0 {
                continue;
            }
            let min_on_axis = aabb.min_on_axis(axis);
            let max_on_axis = aabb.max_on_axis(axis);

            let mut cost_left = 0.0f64;
            let mut cost_right = total_cost;
            let mut num_left = 0usize;
            let mut num_right = triples[axis]
                .iter()
                .filter(|t| t.kind != TripleKind::Max)
                .count();

            for (idx, triple) in triples[axis].iter().enumerate() {
                let object_cost = self.builder.object_cost.of(triple.object_id as usize);
                // The left segment boundary after this event, when the event
                // itself lands on the left side of the candidate plane
                let mut boundary = idx + 1;
                match triple.kind {
                    TripleKind::Max => {
                        cost_right -= object_cost;
                        num_right -= 1;
                    }
                    TripleKind::Flat => {
                        cost_right -= object_cost;
                        num_right -= 1;
                        cost_left += object_cost;
                        num_left += 1;
                    }
                    TripleKind::Min => {
                        boundary = idx;
                    }
                }

                let value = triple.value;
                if value > min_on_axis && value < max_on_axis {
                    let area_left = end_area + wrap * (value - min_on_axis);
                    let area_right = end_area + wrap * (max_on_axis - value);
                    let cost = self.split_cost(
                        area_left / node_area,
                        area_right / node_area,
                        cost_left,
                        cost_right,
                        num_left,
                        num_right,
                    );
                    let beats_current = match &best {
                        Some(b) => cost < b.cost,
                        None => cost < cost_to_beat,
                    };
                    if beats_current {
                        best = Some(SplitChoice {
                            axis,
                            value,
                            num_triples_left: boundary,
                            cost,
                        });
                    }
                }

                if triple.kind == TripleKind::Min {
                    cost_left += object_cost;
                    num_left += 1;
                }
            }
        }
        best
    }

    #[allow(clippy::too_many_arguments)]
    fn split_cost(
        &self,
        area_frac_left: f64,
        area_frac_right: f64,
        cost_left: f64,
        cost_right: f64,
        num_left: usize,
        num_right: usize,
    ) -> f64 {
        match self.builder.split_algorithm {
            SplitAlgorithm::MacDonaldBooth => {
                1.0 + area_frac_left * cost_left + area_frac_right * cost_right
            }
            SplitAlgorithm::MacDonaldBoothModifiedCoefs => {
                let discount = if num_left == 0 || num_right == 0 {
                    0.85
                } else {
                    1.0
                };
                discount * (1.0 + area_frac_left * cost_left + area_frac_right * cost_right)
            }
            SplitAlgorithm::DoubleRecurse => {
                1.0 + area_frac_left * cost_left.powf(0.9)
                    + area_frac_right * cost_right.powf(0.9)
            }
            SplitAlgorithm::DoubleRecurseModifiedCoefs => {
                1.2 * (1.0
                    + area_frac_left * cost_left.powf(0.85)
                    + area_frac_right * cost_right.powf(0.85))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn boxes_to_fns(boxes: Vec<Aabb>) -> impl Fn(usize) -> Aabb {
        move |i| boxes[i]
    }

    fn spread_boxes(n: usize) -> Vec<Aabb> {
        (0..n)
            .map(|i| {
                let base = DVec3::new(2.0 * i as f64, 0.0, 0.0);
                Aabb::new(base, base + DVec3::ONE)
            })
            .collect()
    }

    #[test]
    fn single_object_yields_leaf_root() {
        let boxes = spread_boxes(1);
        let tree = KdTreeBuilder::new()
            .build(1, &boxes_to_fns(boxes), None)
            .unwrap();
        assert_eq!(tree.num_nodes(), 1);
        assert!(tree.node(0).is_leaf());
    }

    #[test]
    fn spread_objects_get_split() {
        let boxes = spread_boxes(16);
        let tree = KdTreeBuilder::new()
            .build(16, &boxes_to_fns(boxes), None)
            .unwrap();
        assert!(tree.num_nodes() > 1);
        assert!(!tree.node(0).is_leaf());
        // Every object appears in some leaf
        let (_, refs) = tree.leaf_stats();
        assert!(refs >= 16);
    }

    #[test]
    fn build_is_deterministic() {
        let boxes = spread_boxes(24);
        let build = || {
            KdTreeBuilder::new()
                .build(24, &boxes_to_fns(boxes.clone()), None)
                .unwrap()
        };
        let a = build();
        let b = build();
        assert_eq!(a.num_nodes(), b.num_nodes());
        for i in 0..a.num_nodes() {
            match (a.node(i), b.node(i)) {
                (
                    KdNode::Split {
                        axis: ax,
                        split_value: va,
                        left: la,
                        right: ra,
                        ..
                    },
                    KdNode::Split {
                        axis: bx,
                        split_value: vb,
                        left: lb,
                        right: rb,
                        ..
                    },
                ) => {
                    assert_eq!(ax, bx);
                    assert_eq!(va, vb);
                    assert_eq!(la, lb);
                    assert_eq!(ra, rb);
                }
                (KdNode::Leaf { objects: oa, .. }, KdNode::Leaf { objects: ob, .. }) => {
                    assert_eq!(oa, ob);
                }
                _ => panic!("node {i} differs in kind"),
            }
        }
    }

    #[test]
    fn leaf_objects_sorted_ascending() {
        let boxes = spread_boxes(8);
        let tree = KdTreeBuilder::new()
            .build(8, &boxes_to_fns(boxes), None)
            .unwrap();
        for i in 0..tree.num_nodes() {
            if let KdNode::Leaf { objects, .. } = tree.node(i) {
                assert!(objects.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn coincident_boxes_terminate() {
        let boxes = vec![Aabb::new(DVec3::ZERO, DVec3::ONE); 32];
        let tree = KdTreeBuilder::new()
            .build(32, &boxes_to_fns(boxes), None)
            .unwrap();
        // No useful split exists; all objects in one leaf (or few nodes)
        let (leaves, refs) = tree.leaf_stats();
        assert!(leaves >= 1);
        assert!(refs >= 32);
    }

    #[test]
    fn storage_exhaustion_reported() {
        let boxes = spread_boxes(64);
        let mut builder = KdTreeBuilder::new();
        builder.set_storage_multiplier(0);
        let result = builder.build(64, &boxes_to_fns(boxes), None);
        assert!(matches!(
            result,
            Err(KdBuildError::StorageExhausted { .. })
        ));
    }

    #[test]
    fn clipped_extent_callback_refines() {
        // One long thin object plus clustered small ones; the callback clips
        // the long object per cell.
        let mut boxes = spread_boxes(8);
        boxes.push(Aabb::new(
            DVec3::new(0.0, 2.0, 0.0),
            DVec3::new(15.0, 2.1, 1.0),
        ));
        let n = boxes.len();
        let boxes_for_extent = boxes.clone();
        let extent = move |i: usize| boxes_for_extent[i];
        let boxes_for_clip = boxes.clone();
        let clip = move |i: usize, bounds: &Aabb| {
            let isect = boxes_for_clip[i].intersection(bounds);
            if isect.is_empty() { None } else { Some(isect) }
        };
        let clip: &ExtentInBoxFn<'_> = &clip;
        let tree = KdTreeBuilder::new().build(n, &extent, Some(clip)).unwrap();
        let (_, refs) = tree.leaf_stats();
        assert!(refs >= n);
    }

    #[test]
    fn empty_scene_builds() {
        let tree = KdTreeBuilder::new().build(0, &|_| unreachable!(), None).unwrap();
        assert_eq!(tree.num_nodes(), 1);
    }
}
