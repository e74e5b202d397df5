//! Front-to-back ray traversal with early exit.

use crate::node::{EMPTY_CHILD, KdNode, KdTree};
use glam::DVec3;

/// Callback verdict after testing one object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraverseAction {
    /// Nothing changed; keep walking.
    Continue,
    /// A hit at this distance: nodes entered beyond it can be skipped.
    Tighten(f64),
    /// Abort the whole traversal (shadow feeler found an occluder).
    Stop,
}

/// One stacked node segment awaiting a visit.
#[derive(Clone, Copy)]
struct TraverseEntry {
    node: i32,
    t_min: f64,
    t_max: f64,
}

impl KdTree {
    /// Walk the tree front to back along a ray, invoking `callback` once per
    /// object id in each leaf the ray enters.
    ///
    /// `seek_distance` bounds the search from the start (shadow feelers pass
    /// the light distance). Returns true when the callback stopped the
    /// traversal early.
    pub fn traverse<F>(
        &self,
        start_pos: DVec3,
        dir: DVec3,
        seek_distance: Option<f64>,
        mut callback: F,
    ) -> bool
    where
        F: FnMut(u32) -> TraverseAction,
    {
        let Some((box_enter, box_exit)) = self.bounding_box.ray_entry_exit(start_pos, dir) else {
            return false;
        };
        if box_exit < 0.0 {
            return false;
        }
        let mut max_useful = seek_distance.unwrap_or(f64::MAX);

        let mut stack: Vec<TraverseEntry> = Vec::with_capacity(64);
        stack.push(TraverseEntry {
            node: 0,
            t_min: box_enter,
            t_max: box_exit.min(max_useful),
        });

        while let Some(entry) = stack.pop() {
            if entry.node == EMPTY_CHILD {
                continue;
            }
            if entry.t_min > max_useful {
                continue; // beyond anything that can still matter
            }
            match &self.nodes[entry.node as usize] {
                KdNode::Leaf { objects, .. } => {
                    for &object in objects {
                        match callback(object) {
                            TraverseAction::Continue => {}
                            TraverseAction::Tighten(new_max) => {
                                if new_max < max_useful {
                                    max_useful = new_max;
                                }
                            }
                            TraverseAction::Stop => return true,
                        }
                    }
                }
                KdNode::Split {
                    axis,
                    split_value,
                    left,
                    right,
                    ..
                } => {
                    let axis = axis.index();
                    let origin = start_pos[axis];
                    let direction = dir[axis];

                    if direction == 0.0 {
                        // Parallel to the plane: only the side holding the
                        // origin is ever entered
                        let side = if origin < *split_value { *left } else { *right };
                        stack.push(TraverseEntry {
                            node: side,
                            t_min: entry.t_min,
                            t_max: entry.t_max,
                        });
                        continue;
                    }

                    let t_split = (*split_value - origin) / direction;
                    let (near, far) = if origin < *split_value
                        || (origin == *split_value && direction <= 0.0)
                    {
                        (*left, *right)
                    } else {
                        (*right, *left)
                    };

                    if t_split >= entry.t_max || t_split < 0.0 {
                        stack.push(TraverseEntry {
                            node: near,
                            t_min: entry.t_min,
                            t_max: entry.t_max,
                        });
                    } else if t_split <= entry.t_min {
                        stack.push(TraverseEntry {
                            node: far,
                            t_min: entry.t_min,
                            t_max: entry.t_max,
                        });
                    } else {
                        // Far first so the near side pops first (LIFO)
                        stack.push(TraverseEntry {
                            node: far,
                            t_min: t_split,
                            t_max: entry.t_max,
                        });
                        stack.push(TraverseEntry {
                            node: near,
                            t_min: entry.t_min,
                            t_max: t_split,
                        });
                    }
                }
            }
        }
        false
    }
}
